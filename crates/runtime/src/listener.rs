//! Change listeners

/// Notified after a commit changes the store.
///
/// `key` is `None` once when the commit cleared the store, then `Some` for
/// every key that was removed or assigned.
pub trait PrefChangeListener: Send + Sync {
    fn on_pref_changed(&self, key: Option<&str>);
}

impl<F> PrefChangeListener for F
where
    F: Fn(Option<&str>) + Send + Sync,
{
    fn on_pref_changed(&self, key: Option<&str>) {
        self(key)
    }
}
