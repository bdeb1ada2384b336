// Operation names module
// The six CRUD operations a service may expose

use hyper::StatusCode;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by operations and hooks
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Find,
    Create,
    Get,
    Update,
    Patch,
    Remove,
}

impl Operation {
    pub const ALL: [Self; 6] = [
        Self::Find,
        Self::Create,
        Self::Get,
        Self::Update,
        Self::Patch,
        Self::Remove,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Create => "create",
            Self::Get => "get",
            Self::Update => "update",
            Self::Patch => "patch",
            Self::Remove => "remove",
        }
    }

    /// Status of a successful response
    pub const fn success_status(self) -> StatusCode {
        match self {
            Self::Create => StatusCode::CREATED,
            _ => StatusCode::OK,
        }
    }

    /// Whether the operation addresses a single record by primary key
    pub const fn needs_pk(self) -> bool {
        matches!(self, Self::Get | Self::Update | Self::Patch | Self::Remove)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_create_is_201() {
        for op in Operation::ALL {
            let expected = if op == Operation::Create {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            assert_eq!(op.success_status(), expected, "{op}");
        }
    }

    #[test]
    fn test_pk_operations() {
        let with_pk: Vec<_> = Operation::ALL.into_iter().filter(|op| op.needs_pk()).collect();
        assert_eq!(
            with_pk,
            vec![
                Operation::Get,
                Operation::Update,
                Operation::Patch,
                Operation::Remove
            ]
        );
    }
}
