use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn task_failed(index: usize, label: impl Into<String>, source: StdErrorBoxed) -> Error {
        Error(
            ErrorKind::TaskFailed {
                index,
                label: label.into(),
                source,
            }
            .into(),
        )
    }

    pub fn task_panicked(
        index: usize,
        label: impl Into<String>,
        message: impl Into<String>,
    ) -> Error {
        Error(
            ErrorKind::TaskPanicked {
                index,
                label: label.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn incomplete_run(expected: usize, completed: usize) -> Error {
        Error(ErrorKind::IncompleteRun { expected, completed }.into())
    }

    pub fn producer_panicked(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::ProducerPanicked {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn disconnected(context: impl Into<String>) -> Error {
        Error(
            ErrorKind::Disconnected {
                context: context.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("task #{index} '{label}' failed: {source}")]
    TaskFailed {
        index: usize,
        label: String,
        source: StdErrorBoxed,
    },

    #[error("task #{index} '{label}' panicked: {message}")]
    TaskPanicked {
        index: usize,
        label: String,
        message: String,
    },

    #[error("incomplete run: {completed} of {expected} tasks completed")]
    IncompleteRun { expected: usize, completed: usize },

    #[error("stream producer '{name}' panicked: {message}")]
    ProducerPanicked { name: String, message: String },

    #[error("channel disconnected: {context}")]
    Disconnected { context: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}
