pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::ErrorKind;

    fn check_bound(bound: usize) -> super::Result<usize> {
        verify_arg!(bound, bound != 0);
        Ok(bound)
    }

    #[test]
    fn test_verify_arg() {
        assert_eq!(check_bound(3).unwrap(), 3);
        let err = check_bound(0).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "bound");
                assert_eq!(message, "bound != 0");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }
}
