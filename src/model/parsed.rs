/// The outcome of a lenient parse: the value that will be used, and whether it had to be made up
/// because the input could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parsed<T> {
    value: T,
    fallback: bool,
}

impl<T> Parsed<T> {
    /// The input was read as-is.
    pub fn exact(value: T) -> Self {
        Self {
            value,
            fallback: false,
        }
    }

    /// The input was unreadable and `value` is a stand-in.
    pub fn fallback(value: T) -> Self {
        Self {
            value,
            fallback: true,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, bool) {
        (self.value, self.fallback)
    }
}
