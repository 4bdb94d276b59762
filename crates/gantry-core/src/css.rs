//! CSS provider cache and resize priority swap
//!
//! Stylesheet providers are content-addressed: loading the same stylesheet
//! twice yields the same provider. During an interactive resize the cache
//! overlays a pre-built lightweight provider at a priority above every
//! ordinary provider, bounding restyling latency, and removes it when the
//! resize quiesces.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use sha2::{Digest, Sha256};

use crate::error::{BindingError, BindingResult};
use crate::handle::NativeHandle;

/// Provider priorities, matching the native toolkit's stacking levels
pub mod priority {
    /// Toolkit fallback styles
    pub const FALLBACK: u32 = 1;
    /// Theme styles
    pub const THEME: u32 = 400;
    /// Settings-driven styles
    pub const SETTING: u32 = 500;
    /// Application styles
    pub const APPLICATION: u32 = 600;
    /// User overrides
    pub const USER: u32 = 800;
    /// The resize overlay; above every ordinary provider
    pub const RESIZE: u32 = 900;
}

/// The lightweight stylesheet overlaid during a resize. Transitions,
/// animations and shadows dominate restyle cost while dragging.
pub const RESIZE_STYLESHEET: &str = "\
* {
    transition: none;
    animation: none;
    box-shadow: none;
}
";

/// SHA-256 digest of a stylesheet's content
pub type ContentHash = [u8; 32];

/// Seam to the native toolkit's style machinery.
///
/// The GTK backend implements this over CSS providers on the default
/// display; tests implement a mock that records attachments.
pub trait StyleBackend: Send + Sync {
    /// Create a native provider holding `content`
    fn create_provider(&self, content: &str) -> BindingResult<NativeHandle>;

    /// Attach a provider to the default display at `priority`
    fn add_for_display(&self, provider: NativeHandle, priority: u32);

    /// Detach a provider from the default display
    fn remove_for_display(&self, provider: NativeHandle);
}

/// Reference to a cached stylesheet provider.
///
/// Two references are equal iff their content hashes match.
#[derive(Debug, Clone, Copy, Eq)]
pub struct ProviderRef {
    handle: NativeHandle,
    hash: ContentHash,
}

impl ProviderRef {
    /// The native provider handle
    #[must_use]
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// The content hash this provider was built from
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        self.hash
    }
}

impl PartialEq for ProviderRef {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

#[derive(Default)]
struct CacheInner {
    providers: HashMap<ContentHash, ProviderRef>,
    display: Vec<ProviderRef>,
    resize_provider: Option<ProviderRef>,
    resize_active: bool,
}

/// Content-addressed provider cache with the resize swap protocol.
///
/// Thread-safe behind a single mutex; native style calls happen while the
/// mutex is held, which is safe because the style backend never re-enters
/// the cache.
pub struct CssCache {
    backend: Arc<dyn StyleBackend>,
    inner: Mutex<CacheInner>,
}

impl CssCache {
    /// Create a cache over a style backend
    #[must_use]
    pub fn new(backend: Arc<dyn StyleBackend>) -> Self {
        Self { backend, inner: Mutex::new(CacheInner::default()) }
    }

    /// Load a stylesheet, reusing the cached provider when the content was
    /// seen before.
    pub fn load_css(&self, content: &str) -> BindingResult<ProviderRef> {
        let hash = content_hash(content);
        let mut inner = self.lock();
        if let Some(provider) = inner.providers.get(&hash) {
            return Ok(*provider);
        }
        let handle = self.backend.create_provider(content)?;
        let provider = ProviderRef { handle, hash };
        inner.providers.insert(hash, provider);
        Ok(provider)
    }

    /// Read a stylesheet file and load it through the cache
    pub fn load_css_file(&self, path: &Path) -> BindingResult<ProviderRef> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BindingError::Style(format!("{}: {e}", path.display())))?;
        self.load_css(&content)
    }

    /// Attach a provider to the default display at the given priority and
    /// track it in the global provider set.
    pub fn add_for_display(&self, provider: ProviderRef, priority: u32) {
        let mut inner = self.lock();
        self.backend.add_for_display(provider.handle, priority);
        if !inner.display.iter().any(|p| p.handle == provider.handle) {
            inner.display.push(provider);
        }
    }

    /// Overlay the lightweight resize provider at [`priority::RESIZE`].
    ///
    /// Idempotent: a second call while active does nothing, so exactly one
    /// resize provider is attached between begin and end.
    pub fn begin_resize_mode(&self) -> BindingResult<()> {
        let mut inner = self.lock();
        if inner.resize_active {
            return Ok(());
        }
        let provider = match inner.resize_provider {
            Some(provider) => provider,
            None => {
                let handle = self.backend.create_provider(RESIZE_STYLESHEET)?;
                let provider = ProviderRef { handle, hash: content_hash(RESIZE_STYLESHEET) };
                inner.resize_provider = Some(provider);
                provider
            }
        };
        self.backend.add_for_display(provider.handle, priority::RESIZE);
        inner.resize_active = true;
        Ok(())
    }

    /// Remove the resize provider. Idempotent.
    pub fn end_resize_mode(&self) {
        let mut inner = self.lock();
        if !inner.resize_active {
            return;
        }
        if let Some(provider) = inner.resize_provider {
            self.backend.remove_for_display(provider.handle);
        }
        inner.resize_active = false;
    }

    /// Whether the resize overlay is currently attached
    #[must_use]
    pub fn is_resize_active(&self) -> bool {
        self.lock().resize_active
    }

    /// Number of distinct cached providers
    #[must_use]
    pub fn provider_count(&self) -> usize {
        self.lock().providers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CssCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("CssCache")
            .field("providers", &inner.providers.len())
            .field("resize_active", &inner.resize_active)
            .finish()
    }
}

/// Hash stylesheet content for the cache key
#[must_use]
pub fn content_hash(content: &str) -> ContentHash {
    Sha256::digest(content.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[derive(Default)]
    struct CountingBackend {
        next: AtomicU64,
        attached: Mutex<Vec<(NativeHandle, u32)>>,
    }

    impl CountingBackend {
        fn attached_at(&self, priority: u32) -> usize {
            self.attached.lock().unwrap().iter().filter(|(_, p)| *p == priority).count()
        }
    }

    impl StyleBackend for CountingBackend {
        fn create_provider(&self, _content: &str) -> BindingResult<NativeHandle> {
            let raw = self.next.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(NativeHandle::from_raw(raw as usize))
        }

        fn add_for_display(&self, provider: NativeHandle, priority: u32) {
            self.attached.lock().unwrap().push((provider, priority));
        }

        fn remove_for_display(&self, provider: NativeHandle) {
            self.attached.lock().unwrap().retain(|(h, _)| *h != provider);
        }
    }

    fn cache() -> (CssCache, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend::default());
        (CssCache::new(backend.clone()), backend)
    }

    #[test]
    fn test_content_addressing() {
        let (cache, _) = cache();
        let a = cache.load_css("button { color: red; }").unwrap();
        let b = cache.load_css("button { color: red; }").unwrap();
        let c = cache.load_css("button { color: blue; }").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.handle(), b.handle());
        assert_ne!(a, c);
        assert_eq!(cache.provider_count(), 2);
    }

    #[test]
    fn test_load_css_file() {
        let (cache, _) = cache();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.css");
        std::fs::write(&path, "label { margin: 2px; }").unwrap();

        let from_file = cache.load_css_file(&path).unwrap();
        let from_string = cache.load_css("label { margin: 2px; }").unwrap();
        assert_eq!(from_file, from_string);

        let missing = cache.load_css_file(&dir.path().join("missing.css"));
        assert!(matches!(missing, Err(BindingError::Style(_))));
    }

    #[test]
    fn test_resize_swap_protocol() {
        let (cache, backend) = cache();
        assert!(!cache.is_resize_active());

        cache.begin_resize_mode().unwrap();
        assert!(cache.is_resize_active());
        assert_eq!(backend.attached_at(priority::RESIZE), 1);

        // Idempotent begin: still exactly one resize provider attached.
        cache.begin_resize_mode().unwrap();
        assert_eq!(backend.attached_at(priority::RESIZE), 1);

        cache.end_resize_mode();
        assert!(!cache.is_resize_active());
        assert_eq!(backend.attached_at(priority::RESIZE), 0);

        // Idempotent end.
        cache.end_resize_mode();
        assert_eq!(backend.attached_at(priority::RESIZE), 0);
    }

    #[test]
    fn test_resize_provider_reused_across_cycles() {
        let (cache, backend) = cache();
        cache.begin_resize_mode().unwrap();
        cache.end_resize_mode();
        cache.begin_resize_mode().unwrap();
        cache.end_resize_mode();
        // One provider created, attached/detached twice.
        assert_eq!(backend.next.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_priority_constants() {
        assert!(priority::RESIZE > priority::USER);
        assert!(priority::USER > priority::APPLICATION);
        assert!(priority::APPLICATION > priority::SETTING);
        assert!(priority::SETTING > priority::THEME);
        assert!(priority::THEME > priority::FALLBACK);
        assert_eq!(priority::RESIZE, 900);
    }

    #[test]
    fn test_add_for_display_tracks_globals() {
        let (cache, backend) = cache();
        let provider = cache.load_css("window { padding: 0; }").unwrap();
        cache.add_for_display(provider, priority::APPLICATION);
        cache.add_for_display(provider, priority::APPLICATION);
        assert_eq!(backend.attached.lock().unwrap().len(), 2);
        // Tracked once in the global set despite the double attach.
        assert_eq!(cache.lock().display.len(), 1);
    }
}
