use std::fmt;

/// センサーSDKのステータスコード
///
/// 0 = 成功、正値 = 警告（処理は継続可能）、負値 = エラー。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    pub const NO_ERROR: Status = Status(0);

    // エラー
    pub const FEATURE_UNSUPPORTED: Status = Status(-1);
    pub const PARAM_UNSUPPORTED: Status = Status(-2);
    pub const ITEM_UNAVAILABLE: Status = Status(-3);
    pub const HANDLE_INVALID: Status = Status(-101);
    pub const ALLOC_FAILED: Status = Status(-102);
    pub const DEVICE_FAILED: Status = Status(-201);
    pub const DEVICE_LOST: Status = Status(-202);
    pub const DEVICE_BUSY: Status = Status(-203);
    pub const EXEC_ABORTED: Status = Status(-301);
    pub const EXEC_INPROGRESS: Status = Status(-302);
    pub const EXEC_TIMEOUT: Status = Status(-303);
    pub const DATA_UNAVAILABLE: Status = Status(-501);
    pub const NOT_INITIALIZED: Status = Status(-502);
    pub const INIT_FAILED: Status = Status(-503);

    // 警告
    pub const TIME_GAP: Status = Status(101);
    pub const DATA_NOT_CHANGED: Status = Status(103);
    pub const VALUE_OUT_OF_RANGE: Status = Status(105);

    /// エラー（負値）か
    pub fn is_error(self) -> bool {
        self.0 < 0
    }

    /// 成功または警告か
    pub fn is_ok(self) -> bool {
        !self.is_error()
    }

    /// 既知のコード名
    pub fn name(self) -> &'static str {
        match self.0 {
            0 => "NO_ERROR",
            -1 => "FEATURE_UNSUPPORTED",
            -2 => "PARAM_UNSUPPORTED",
            -3 => "ITEM_UNAVAILABLE",
            -101 => "HANDLE_INVALID",
            -102 => "ALLOC_FAILED",
            -201 => "DEVICE_FAILED",
            -202 => "DEVICE_LOST",
            -203 => "DEVICE_BUSY",
            -301 => "EXEC_ABORTED",
            -302 => "EXEC_INPROGRESS",
            -303 => "EXEC_TIMEOUT",
            -501 => "DATA_UNAVAILABLE",
            -502 => "NOT_INITIALIZED",
            -503 => "INIT_FAILED",
            101 => "TIME_GAP",
            103 => "DATA_NOT_CHANGED",
            105 => "VALUE_OUT_OF_RANGE",
            _ => "UNKNOWN",
        }
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::NO_ERROR
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_is_not_error() {
        assert!(Status::NO_ERROR.is_ok());
        assert!(Status::TIME_GAP.is_ok());
        assert!(Status::DEVICE_LOST.is_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(Status::EXEC_TIMEOUT.to_string(), "EXEC_TIMEOUT(-303)");
        assert_eq!(Status(-999).to_string(), "UNKNOWN(-999)");
    }
}
