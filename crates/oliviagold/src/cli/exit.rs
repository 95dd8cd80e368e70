//! Exit codes.

/// How a command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Validation refused to run; nothing was executed.
    Refused,
    /// The command ran and failed, or could not start.
    Failed,
}

impl Outcome {
    /// `0` on success, `1` otherwise. With `distinct`, refusals exit `3`.
    pub fn code(self, distinct: bool) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::Refused if distinct => 3,
            Outcome::Refused | Outcome::Failed => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Outcome::Success.code(false), 0);
        assert_eq!(Outcome::Refused.code(false), 1);
        assert_eq!(Outcome::Failed.code(false), 1);
        assert_eq!(Outcome::Success.code(true), 0);
        assert_eq!(Outcome::Refused.code(true), 3);
        assert_eq!(Outcome::Failed.code(true), 1);
    }
}
