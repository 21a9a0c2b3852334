//! # Identity resolution
//!
//! An asteroid reaches the catalogue under up to two natural keys: the source catalogue
//! identifier (`neo_id`, compared case-insensitively) and the JPL SPK-id. Input rows may
//! carry either, both, or neither. The [`IdentityResolver`] maps those keys onto a single
//! surrogate key ([`IdInternal`]) for the whole run.
//!
//! ## Resolution order
//! -----------------
//! 1. A natural id present and already known resolves immediately.
//! 2. Otherwise a known SPK-id resolves, and the natural id is attached to that key.
//! 3. Rows with neither key fall back to a run-local designation key
//!    (`designation_full`, else `designation`), so repeated anonymous rows still merge.
//! 4. Anything else is [`Resolution::Unknown`] (a new asteroid) or, with no key at all,
//!    [`Resolution::Unidentifiable`].
//!
//! The resolver never allocates database keys: after an insert the caller reports the new
//! key through [`IdentityResolver::register`]. The offline builder uses
//! [`IdentityResolver::resolve_or_mint`] with its own counter instead.
use ahash::AHashMap;

use crate::constants::{IdInternal, SpkId};

/// Keys read from one input row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityKeys {
    pub neo_id: Option<String>,
    pub spkid: Option<SpkId>,
    /// Run-local fallback key, only consulted when both natural keys are missing
    pub designation: Option<String>,
}

impl IdentityKeys {
    /// `true` when the row carries neither a natural id nor an SPK-id
    pub fn lacks_natural_keys(&self) -> bool {
        self.neo_id.is_none() && self.spkid.is_none()
    }

    fn neo_key(&self) -> Option<String> {
        self.neo_id.as_deref().map(str::to_lowercase)
    }

    fn designation_key(&self) -> Option<String> {
        if !self.lacks_natural_keys() {
            return None;
        }
        self.designation.as_deref().map(str::to_lowercase)
    }
}

/// Outcome of [`IdentityResolver::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The keys map onto an existing asteroid
    Known(IdInternal),
    /// The keys are new: the asteroid has to be created
    Unknown,
    /// The row carries no key at all and cannot be attached to an asteroid
    Unidentifiable,
}

impl Resolution {
    pub fn id(&self) -> Option<IdInternal> {
        match self {
            Resolution::Known(id) => Some(*id),
            _ => None,
        }
    }
}

/// Run-scoped map from natural keys to surrogate keys
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    by_neo_id: AHashMap<String, IdInternal>,
    by_spkid: AHashMap<SpkId, IdInternal>,
    by_designation: AHashMap<String, IdInternal>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a resolver seeded with the keys already in storage.
    ///
    /// Arguments
    /// -----------------
    /// * `known`: `(id_internal, neo_id, spkid)` triples
    pub fn from_existing<I>(known: I) -> Self
    where
        I: IntoIterator<Item = (IdInternal, Option<String>, Option<SpkId>)>,
    {
        let mut resolver = Self::new();
        for (id, neo_id, spkid) in known {
            if let Some(neo_id) = neo_id.filter(|n| !n.trim().is_empty()) {
                resolver.by_neo_id.insert(neo_id.to_lowercase(), id);
            }
            if let Some(spkid) = spkid {
                resolver.by_spkid.insert(spkid, id);
            }
        }
        resolver
    }

    /// Number of distinct natural-key entries (both maps)
    pub fn len(&self) -> usize {
        self.by_neo_id.len() + self.by_spkid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.by_designation.is_empty()
    }

    /// Asteroid currently owning an SPK-id
    pub fn spk_owner(&self, spkid: SpkId) -> Option<IdInternal> {
        self.by_spkid.get(&spkid).copied()
    }

    /// Resolve the keys of a row.
    ///
    /// A natural id resolved through the SPK-id is registered on the way, so later rows
    /// carrying only the natural id land on the same asteroid.
    pub fn resolve(&mut self, keys: &IdentityKeys) -> Resolution {
        if let Some(neo_key) = keys.neo_key() {
            if let Some(&id) = self.by_neo_id.get(&neo_key) {
                return Resolution::Known(id);
            }
            if let Some(id) = keys.spkid.and_then(|spk| self.spk_owner(spk)) {
                self.by_neo_id.insert(neo_key, id);
                return Resolution::Known(id);
            }
            return Resolution::Unknown;
        }

        if let Some(spkid) = keys.spkid {
            return match self.spk_owner(spkid) {
                Some(id) => Resolution::Known(id),
                None => Resolution::Unknown,
            };
        }

        match keys.designation_key() {
            Some(key) => match self.by_designation.get(&key) {
                Some(&id) => Resolution::Known(id),
                None => Resolution::Unknown,
            },
            None => Resolution::Unidentifiable,
        }
    }

    /// Record that `keys` belong to asteroid `id`.
    ///
    /// Existing entries are never overwritten: an SPK-id already owned by another asteroid
    /// keeps its owner.
    pub fn register(&mut self, keys: &IdentityKeys, id: IdInternal) {
        if let Some(neo_key) = keys.neo_key() {
            self.by_neo_id.entry(neo_key).or_insert(id);
        }
        if let Some(spkid) = keys.spkid {
            self.by_spkid.entry(spkid).or_insert(id);
        }
        if let Some(key) = keys.designation_key() {
            self.by_designation.entry(key).or_insert(id);
        }
    }

    /// Resolve, minting and registering a new key when the asteroid is unknown.
    ///
    /// Return
    /// ----------
    /// * `None` for unidentifiable rows, otherwise the key and whether it was just minted.
    pub fn resolve_or_mint(
        &mut self,
        keys: &IdentityKeys,
        mint: impl FnOnce() -> IdInternal,
    ) -> Option<(IdInternal, bool)> {
        match self.resolve(keys) {
            Resolution::Known(id) => {
                self.register(keys, id);
                Some((id, false))
            }
            Resolution::Unknown => {
                let id = mint();
                self.register(keys, id);
                Some((id, true))
            }
            Resolution::Unidentifiable => None,
        }
    }
}

/// Sequential key source for catalogues built without a database, starting at 1
#[derive(Debug, Clone)]
pub struct KeyCounter {
    next: IdInternal,
}

impl Default for KeyCounter {
    fn default() -> Self {
        KeyCounter { next: 1 }
    }
}

impl KeyCounter {
    pub fn mint(&mut self) -> IdInternal {
        let id = self.next;
        self.next += 1;
        id
    }
}
