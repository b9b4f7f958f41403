use std::borrow::Cow;
use tinybus_derive::tinybus_error;

#[tinybus_error]
pub enum DemoError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Invalid input{}: {message}", format_context(.context))]
    Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn open() -> Result<(), DemoError> {
    Err(std::io::Error::other("missing")).context("opening demo file")
}

fn main() {
    let _ = open();
}
