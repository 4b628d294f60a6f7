//! Ordered per-category callback bindings.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use homestead_core::HookCategory;
use tracing::{debug, error};

use super::callback::Callback;
use super::spec::HookSpec;
use crate::module::ModuleId;

/// Public view of one binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    /// Category the callback is bound to.
    pub category: HookCategory,
    /// Module that registered the callback.
    pub owner: ModuleId,
    /// Global registration sequence number.
    pub sequence: u64,
}

/// A callback bound to category `H`.
pub struct HookBinding<H: HookSpec> {
    owner: ModuleId,
    sequence: u64,
    callback: Callback<H>,
}

impl<H: HookSpec> HookBinding<H> {
    /// Module that registered the callback.
    #[must_use]
    pub fn owner(&self) -> &ModuleId {
        &self.owner
    }

    /// Global registration sequence number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The callback itself.
    #[must_use]
    pub fn callback(&self) -> &Callback<H> {
        &self.callback
    }

    /// Public view of the binding.
    #[must_use]
    pub fn info(&self) -> BindingInfo {
        BindingInfo {
            category: H::CATEGORY,
            owner: self.owner.clone(),
            sequence: self.sequence,
        }
    }
}

impl<H: HookSpec> fmt::Debug for HookBinding<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookBinding")
            .field("category", &H::CATEGORY)
            .field("owner", &self.owner)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

trait ErasedBindings: Send + Sync {
    fn infos(&self) -> Vec<BindingInfo>;
    fn len(&self) -> usize;
    fn discard_owner(&mut self, owner: &ModuleId) -> usize;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Bindings<H: HookSpec>(Vec<HookBinding<H>>);

impl<H: HookSpec> ErasedBindings for Bindings<H> {
    fn infos(&self) -> Vec<BindingInfo> {
        self.0.iter().map(HookBinding::info).collect()
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn discard_owner(&mut self, owner: &ModuleId) -> usize {
        let before = self.0.len();
        self.0.retain(|b| &b.owner != owner);
        before.saturating_sub(self.0.len())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Callback bindings for every category.
///
/// Bindings only ever get appended, and all categories draw sequence
/// numbers from one counter, so iterating a category yields its callbacks
/// in registration order.
#[derive(Default)]
pub struct HookRegistry {
    categories: HashMap<HookCategory, Box<dyn ErasedBindings>>,
    next_sequence: u64,
}

impl HookRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback to category `H`.
    pub fn bind<H: HookSpec>(&mut self, owner: ModuleId, callback: Callback<H>) -> BindingInfo {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.saturating_add(1);

        let binding = HookBinding {
            owner,
            sequence,
            callback,
        };
        let info = binding.info();

        let slot = self
            .categories
            .entry(H::CATEGORY)
            .or_insert_with(|| Box::new(Bindings::<H>(Vec::new())));
        match slot.as_any_mut().downcast_mut::<Bindings<H>>() {
            Some(bindings) => {
                bindings.0.push(binding);
                debug!(
                    category = %H::CATEGORY,
                    module = %info.owner,
                    sequence,
                    "hook callback bound"
                );
            },
            None => {
                error!(category = %H::CATEGORY, "hook binding type mismatch, callback dropped");
            },
        }
        info
    }

    /// Bindings of category `H`, in registration order.
    #[must_use]
    pub fn bindings<H: HookSpec>(&self) -> &[HookBinding<H>] {
        self.categories
            .get(&H::CATEGORY)
            .and_then(|slot| slot.as_any().downcast_ref::<Bindings<H>>())
            .map(|bindings| bindings.0.as_slice())
            .unwrap_or(&[])
    }

    /// Public view of the bindings of `category`, in registration order.
    #[must_use]
    pub fn infos(&self, category: HookCategory) -> Vec<BindingInfo> {
        self.categories
            .get(&category)
            .map(|slot| slot.infos())
            .unwrap_or_default()
    }

    /// Number of callbacks bound to `category`.
    #[must_use]
    pub fn count(&self, category: HookCategory) -> usize {
        self.categories.get(&category).map_or(0, |slot| slot.len())
    }

    /// Total number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.values().map(|slot| slot.len()).sum()
    }

    /// Whether nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every binding registered by `owner`.
    ///
    /// Only used while the host is being built, to roll back a module whose
    /// constructor failed.
    pub(crate) fn discard_owner(&mut self, owner: &ModuleId) -> usize {
        self.categories
            .values_mut()
            .map(|slot| slot.discard_owner(owner))
            .sum()
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(HookCategory, usize)> = self
            .categories
            .iter()
            .map(|(category, slot)| (*category, slot.len()))
            .collect();
        counts.sort_unstable();
        f.debug_struct("HookRegistry")
            .field("bindings", &counts)
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}
