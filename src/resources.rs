// SPDX-License-Identifier: LGPL-3.0-or-later OR MPL-2.0
// This file is a part of `piet-raster`.
//
// `piet-raster` is free software: you can redistribute it and/or modify it under the
// terms of either:
//
// * GNU Lesser General Public License as published by the Free Software Foundation, either
//   version 3 of the License, or (at your option) any later version.
// * Mozilla Public License as published by the Mozilla Foundation, version 2.
// * The Patron License (https://github.com/notgull/piet-hardware/blob/main/LICENSE-PATRON.md)
//   for sponsors and contributors, who can ignore the copyleft provisions of the above licenses
//   for this project.
//
// `piet-raster` is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR
// PURPOSE. See the GNU Lesser General Public License or the Mozilla Public License for more
// details.
//
// You should have received a copy of the GNU Lesser General Public License and the Mozilla
// Public License along with `piet-raster`. If not, see <https://www.gnu.org/licenses/>.

//! Loading and caching bitmaps.

use super::image::Bitmap;
use super::ResultExt;

use ahash::RandomState;
use hashbrown::hash_map::{Entry, HashMap};
use piet::Error as Pierror;

use std::path::{Path, PathBuf};

/// Something that can turn a bitmap name into pixels.
///
/// Each platform supplies its own loader; decoding is not part of drawing.
pub trait BitmapLoader {
    /// Load the bitmap called `name` at the given pixel scale.
    fn load(&self, name: &str, scale: f64) -> Result<Bitmap, Pierror>;
}

impl<L: BitmapLoader + ?Sized> BitmapLoader for &L {
    fn load(&self, name: &str, scale: f64) -> Result<Bitmap, Pierror> {
        (**self).load(name, scale)
    }
}

/// The loader for platforms that can't decode bitmaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl BitmapLoader for Unsupported {
    fn load(&self, name: &str, _scale: f64) -> Result<Bitmap, Pierror> {
        tracing::warn!("bitmap loading is not supported on this platform ({})", name);
        Err(Pierror::NotSupported)
    }
}

/// Loads PNG files from a directory.
///
/// For a scale other than one, a file with an `@2x`-style suffix is tried first.
#[derive(Debug, Clone)]
pub struct PngLoader {
    root: PathBuf,
}

impl PngLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn decode(path: &Path, scale: f64) -> Result<Bitmap, Pierror> {
        let pixmap = tiny_skia::Pixmap::load_png(path).piet_err()?;
        let (width, height) = (pixmap.width(), pixmap.height());

        // `tiny-skia` already stores premultiplied RGBA8.
        Bitmap::new(width, height, scale, pixmap.take())
    }
}

impl BitmapLoader for PngLoader {
    fn load(&self, name: &str, scale: f64) -> Result<Bitmap, Pierror> {
        let path = self.root.join(name);
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("png"));
        if !is_png {
            tracing::warn!("no decoder for {}", path.display());
            return Err(Pierror::NotSupported);
        }

        if (scale - 1.0).abs() > f64::EPSILON {
            let scaled = scaled_name(&path, scale);
            if scaled.is_file() {
                return Self::decode(&scaled, scale);
            }
        }

        // Fall back to the unscaled file and resample it.
        let bitmap = Self::decode(&path, 1.0)?;
        bitmap.scaled(scale)
    }
}

fn scaled_name(path: &Path, scale: f64) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    path.with_file_name(format!("{}@{}x.{}", stem, scale, ext))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    name: String,
    scale_bits: u64,
}

impl CacheKey {
    fn new(name: &str, scale: f64) -> Self {
        Self {
            name: name.to_owned(),
            // Collapse -0.0 onto 0.0 so that equal scales hash equally.
            scale_bits: (scale + 0.0).to_bits(),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    bitmap: Bitmap,
    last_used: u64,
}

/// Bitmaps keyed by name and scale, evicted least recently used first once the byte budget
/// is exceeded.
#[derive(Debug)]
pub struct BitmapCache {
    entries: HashMap<CacheKey, CacheEntry, RandomState>,

    /// The most bytes the cache holds before evicting.
    budget: usize,

    /// Bytes held right now.
    used: usize,

    /// Logical clock for recency.
    tick: u64,
}

impl BitmapCache {
    /// Create an empty cache holding at most `budget` bytes of pixels.
    pub fn new(budget: usize) -> Self {
        Self {
            entries: HashMap::with_hasher(RandomState::new()),
            budget,
            used: 0,
            tick: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes of pixel data currently held.
    pub fn bytes_used(&self) -> usize {
        self.used
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Look up a bitmap, marking it as recently used.
    pub fn get(&mut self, name: &str, scale: f64) -> Option<Bitmap> {
        self.tick += 1;
        let tick = self.tick;

        let entry = self.entries.get_mut(&CacheKey::new(name, scale))?;
        entry.last_used = tick;
        tracing::debug!("bitmap cache hit for {}@{}", name, scale);
        Some(entry.bitmap.clone())
    }

    /// Add a bitmap, replacing any with the same name and scale.
    ///
    /// The newly inserted bitmap is never evicted by its own insertion, even if it alone
    /// exceeds the budget.
    pub fn insert(&mut self, name: &str, scale: f64, bitmap: Bitmap) {
        self.tick += 1;
        let key = CacheKey::new(name, scale);
        let bytes = bitmap.byte_len();

        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut o) => {
                self.used -= o.get().bitmap.byte_len();
                o.insert(CacheEntry {
                    bitmap,
                    last_used: self.tick,
                });
            }

            Entry::Vacant(v) => {
                v.insert(CacheEntry {
                    bitmap,
                    last_used: self.tick,
                });
            }
        }

        self.used += bytes;
        tracing::debug!("cached {}@{} ({} bytes)", name, scale, bytes);
        self.trim(Some(&key));
    }

    /// Remove a bitmap. Clones handed out earlier stay valid.
    pub fn evict(&mut self, name: &str, scale: f64) -> Option<Bitmap> {
        let entry = self.entries.remove(&CacheKey::new(name, scale))?;
        self.used -= entry.bitmap.byte_len();
        Some(entry.bitmap)
    }

    /// Remove every bitmap.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.used = 0;
    }

    /// Change the budget, evicting as needed.
    pub fn set_budget(&mut self, budget: usize) {
        self.budget = budget;
        self.trim(None);
    }

    /// Get a bitmap, loading it through `loader` on a miss.
    ///
    /// A failed load yields an empty placeholder bitmap, which is not cached.
    pub fn load(&mut self, loader: &impl BitmapLoader, name: &str, scale: f64) -> Bitmap {
        if let Some(bitmap) = self.get(name, scale) {
            return bitmap;
        }

        match loader.load(name, scale) {
            Ok(bitmap) => {
                self.insert(name, scale, bitmap.clone());
                bitmap
            }

            Err(e) => {
                tracing::warn!("failed to load bitmap {}@{}: {}", name, scale, e);
                Bitmap::empty()
            }
        }
    }

    fn trim(&mut self, keep: Option<&CacheKey>) {
        while self.used > self.budget {
            let victim = self
                .entries
                .iter()
                .filter(|(key, _)| Some(*key) != keep)
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());

            let victim = match victim {
                Some(victim) => victim,
                None => break,
            };

            if let Some(entry) = self.entries.remove(&victim) {
                self.used -= entry.bitmap.byte_len();
                tracing::debug!(
                    "evicted {} at scale {} from the bitmap cache",
                    victim.name,
                    f64::from_bits(victim.scale_bits)
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    fn bitmap(side: u32) -> Bitmap {
        Bitmap::new(side, side, 1.0, vec![0xFF; (side * side * 4) as usize]).unwrap()
    }

    struct CountingLoader {
        calls: Cell<usize>,
    }

    impl BitmapLoader for CountingLoader {
        fn load(&self, name: &str, scale: f64) -> Result<Bitmap, Pierror> {
            self.calls.set(self.calls.get() + 1);
            if name == "missing.png" {
                Err(Pierror::InvalidInput)
            } else {
                Ok(Bitmap::new(1, 1, scale, vec![1, 2, 3, 4]).unwrap())
            }
        }
    }

    #[test]
    fn keyed_by_name_and_scale() {
        let mut cache = BitmapCache::new(1 << 20);
        cache.insert("knob.png", 1.0, bitmap(2));
        cache.insert("knob.png", 2.0, bitmap(4));

        assert_eq!(cache.get("knob.png", 1.0).map(|b| b.width()), Some(2));
        assert_eq!(cache.get("knob.png", 2.0).map(|b| b.width()), Some(4));
        assert!(cache.get("knob.png", 3.0).is_none());
        assert_eq!(cache.bytes_used(), 16 + 64);
    }

    #[test]
    fn evicts_least_recently_used() {
        // Room for two 4x4 bitmaps.
        let mut cache = BitmapCache::new(128);
        cache.insert("a", 1.0, bitmap(4));
        cache.insert("b", 1.0, bitmap(4));
        cache.get("a", 1.0);
        cache.insert("c", 1.0, bitmap(4));

        assert!(cache.get("a", 1.0).is_some());
        assert!(cache.get("b", 1.0).is_none());
        assert!(cache.get("c", 1.0).is_some());
        assert_eq!(cache.bytes_used(), 128);
    }

    #[test]
    fn oversized_insert_is_kept() {
        let mut cache = BitmapCache::new(8);
        cache.insert("small", 1.0, bitmap(1));
        cache.insert("big", 1.0, bitmap(8));

        assert_eq!(cache.len(), 1);
        assert!(cache.get("big", 1.0).is_some());
    }

    #[test]
    fn replacing_updates_usage() {
        let mut cache = BitmapCache::new(1 << 20);
        cache.insert("a", 1.0, bitmap(4));
        cache.insert("a", 1.0, bitmap(2));
        assert_eq!(cache.bytes_used(), 16);

        assert!(cache.evict("a", 1.0).is_some());
        assert_eq!(cache.bytes_used(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn load_uses_cache_and_placeholder() {
        let loader = CountingLoader {
            calls: Cell::new(0),
        };
        let mut cache = BitmapCache::new(1 << 20);

        let first = cache.load(&loader, "ok.png", 1.0);
        let second = cache.load(&loader, "ok.png", 1.0);
        assert_eq!(first.pixel(0, 0), second.pixel(0, 0));
        assert_eq!(loader.calls.get(), 1);

        let missing = cache.load(&loader, "missing.png", 1.0);
        assert!(missing.is_empty());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unsupported_platform_gives_placeholder() {
        let mut cache = BitmapCache::new(1024);
        assert!(cache.load(&Unsupported, "knob.png", 1.0).is_empty());
    }

    #[test]
    fn png_loader_checks_extension() {
        let loader = PngLoader::new(std::env::temp_dir());
        assert!(matches!(
            loader.load("skin.jpg", 1.0),
            Err(Pierror::NotSupported)
        ));
        assert!(loader.load("does-not-exist.png", 1.0).is_err());
        assert_eq!(
            scaled_name(Path::new("/a/knob.png"), 2.0),
            PathBuf::from("/a/knob@2x.png")
        );
    }
}
