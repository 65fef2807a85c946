/// A value that is being loaded asynchronously.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> LoadState<T> {
    /// The loaded value, or `default` while loading or after a failure.
    pub fn success_or(self, default: T) -> T {
        match self {
            LoadState::Success(value) => value,
            _ => default,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}
