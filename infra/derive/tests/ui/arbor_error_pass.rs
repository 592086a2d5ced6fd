use arbor_derive::arbor_error;
use std::borrow::Cow;

#[arbor_error]
pub enum PathError {
    #[error("Bad index{}: {source}", format_context(.context))]
    Index { source: std::num::ParseIntError, context: Option<Cow<'static, str>> },

    #[error("Out of range{}: {index}", format_context(.context))]
    OutOfRange { index: usize, context: Option<Cow<'static, str>> },
}

fn index(raw: &str) -> Result<usize, PathError> {
    raw.parse::<usize>().context("collection[x]")
}

fn main() {
    let err = index("x").unwrap_err();
    assert_eq!(err.kind(), "Index");
    assert!(err.to_string().starts_with("Bad index (collection[x]): "));

    let err: PathError = "-1".parse::<usize>().unwrap_err().into();
    assert_eq!(err.to_string().find('('), None);

    let err = Err::<(), _>(PathError::OutOfRange { index: 3, context: None })
        .context("collection[3]")
        .unwrap_err();
    assert_eq!(err.kind(), "OutOfRange");
    assert_eq!(err.to_string(), "Out of range (collection[3]): 3");
    assert_eq!(err.with_context("lines[3]").to_string(), "Out of range (lines[3]): 3");
}
