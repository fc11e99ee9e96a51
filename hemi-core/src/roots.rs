use crate::store::Handle;

/// The set of named bindings that keep objects alive.
///
/// Implementors call `f` once for every global that is currently
/// bound, in whatever order they choose. The collector copies in
/// that order, so a stable order gives a stable heap layout.
pub trait Roots {
    fn for_each_global(&self, f: &mut dyn FnMut(&str, Handle));
}

// No roots at all: a collection frees everything
impl Roots for () {
    fn for_each_global(&self, _: &mut dyn FnMut(&str, Handle)) {}
}

/// An ordered table of global bindings.
#[derive(Default, Debug, Clone)]
pub struct Globals {
    // Declaration order is kept so enumeration is deterministic
    bindings: Vec<(String, Option<Handle>)>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`, declaring it if needed. Returns the previous binding.
    pub fn bind(&mut self, name: &str, handle: Handle) -> Option<Handle> {
        match self.bindings.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => slot.replace(handle),
            None => {
                self.bindings.push((name.to_owned(), Some(handle)));
                None
            }
        }
    }

    /// Drop the binding but keep the name declared.
    pub fn unbind(&mut self, name: &str) -> Option<Handle> {
        self.bindings.iter_mut()
            .find(|(n, _)| n == name)
            .and_then(|(_, slot)| slot.take())
    }

    pub fn get(&self, name: &str) -> Option<Handle> {
        self.bindings.iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, h)| *h)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Roots for Globals {
    fn for_each_global(&self, f: &mut dyn FnMut(&str, Handle)) {
        for (name, handle) in self.bindings.iter() {
            if let Some(h) = handle {
                f(name, *h);
            }
        }
    }
}
