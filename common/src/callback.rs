use std::sync::Arc;

/// Optional shared observer. Cloning shares the same closure.
pub struct Callback<A> {
    inner: Option<Arc<dyn Fn(A) + Send + Sync>>,
}

impl<A> Callback<A> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Some(Arc::new(f)),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    pub fn is_some(&self) -> bool {
        self.inner.is_some()
    }

    /// Invoke the observer if one is installed.
    #[inline]
    pub fn emit(&self, arg: A) {
        if let Some(f) = self.inner.as_ref() {
            f(arg);
        }
    }
}

impl<A> Clone for Callback<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A> Default for Callback<A> {
    fn default() -> Self {
        Self::none()
    }
}

impl<A> std::fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner {
            None => write!(f, "Callback::None"),
            Some(_) => write!(f, "Callback::Some(...)"),
        }
    }
}
