// argument.rs - One call parameter or return slot
//
// An Argument ties a type encoding, its descriptor and exactly one storage
// block together:
//
//   Unconfigured -> Configured -> Bound -> ValueSet* -> Released
//
// Rebinding releases the previous storage before allocating the next one.
// Released is terminal; it is reached once, by `release` or on drop.
//
// Objects written into `@` slots stay pinned by the argument until the slot
// is overwritten or the storage goes away, so collecting boxed objects can
// never free one a live slot still points at.

use crate::error::MarshalError;
use crate::marshal::Marshaller;
use crate::native::ObjectRef;
use crate::structs::struct_to_script;
use crate::value::ScriptValue;
use bridge_core::{parse_with, Storage, StorageAllocator, StructRegistry, TypeDescriptor};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgumentState {
    Unconfigured,
    Configured,
    Bound,
    ValueSet,
    Released,
}

impl fmt::Display for ArgumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgumentState::Unconfigured => "unconfigured",
            ArgumentState::Configured => "configured",
            ArgumentState::Bound => "bound",
            ArgumentState::ValueSet => "set",
            ArgumentState::Released => "released",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArgumentFlags {
    pub is_return_value: bool,
    /// Bound to caller memory the argument does not own.
    pub is_out_argument: bool,
    pub is_auto_call: bool,
}

pub struct Argument {
    encoding: Option<String>,
    ty: Option<TypeDescriptor>,
    storage: Option<Storage>,
    pinned: Vec<ObjectRef>,
    flags: ArgumentFlags,
    state: ArgumentState,
}

impl Argument {
    pub fn new() -> Self {
        Self {
            encoding: None,
            ty: None,
            storage: None,
            pinned: Vec::new(),
            flags: ArgumentFlags::default(),
            state: ArgumentState::Unconfigured,
        }
    }

    pub fn return_value() -> Self {
        let mut arg = Self::new();
        arg.flags.is_return_value = true;
        arg
    }

    #[inline]
    pub fn state(&self) -> ArgumentState {
        self.state
    }

    #[inline]
    pub fn flags(&self) -> ArgumentFlags {
        self.flags
    }

    pub fn set_auto_call(&mut self, auto_call: bool) {
        self.flags.is_auto_call = auto_call;
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn type_descriptor(&self) -> Option<&TypeDescriptor> {
        self.ty.as_ref()
    }

    pub fn storage(&self) -> Option<&Storage> {
        self.storage.as_ref()
    }

    /// Address of the bound storage, as passed to native code.
    pub fn address(&self) -> Option<usize> {
        self.storage.as_ref().map(Storage::address)
    }

    fn ensure_live(&self) -> Result<(), MarshalError> {
        if self.state == ArgumentState::Released {
            return Err(MarshalError::InvalidState {
                state: self.state,
                expected: "not released",
            });
        }
        Ok(())
    }

    fn configured_type(&self) -> Result<&TypeDescriptor, MarshalError> {
        self.ty.as_ref().ok_or(MarshalError::InvalidState {
            state: self.state,
            expected: "configured",
        })
    }

    fn ensure_bound(&self) -> Result<(), MarshalError> {
        match self.state {
            ArgumentState::Bound | ArgumentState::ValueSet => Ok(()),
            state => Err(MarshalError::InvalidState {
                state,
                expected: "bound",
            }),
        }
    }

    fn parts(&self) -> Result<(&TypeDescriptor, &Storage), MarshalError> {
        self.ensure_bound()?;
        match (&self.ty, &self.storage) {
            (Some(ty), Some(storage)) => Ok((ty, storage)),
            _ => Err(MarshalError::InvalidState {
                state: self.state,
                expected: "bound",
            }),
        }
    }

    fn parts_mut(&mut self) -> Result<(&TypeDescriptor, &mut Storage), MarshalError> {
        self.ensure_bound()?;
        match (&self.ty, &mut self.storage) {
            (Some(ty), Some(storage)) => Ok((ty, storage)),
            _ => Err(MarshalError::InvalidState {
                state: self.state,
                expected: "bound",
            }),
        }
    }

    /// Drop any bound storage. External storage is only forgotten.
    fn unbind(&mut self) {
        if let Some(storage) = self.storage.take() {
            tracing::debug!(
                encoding = self.encoding.as_deref().unwrap_or(""),
                owned = storage.is_owned(),
                "releasing argument storage"
            );
        }
        self.pinned.clear();
        self.flags.is_out_argument = false;
    }

    /// Parse `encoding` and take its descriptor. Releases storage bound to a
    /// previous type. On error the argument is left untouched.
    pub fn configure(&mut self, encoding: &str, registry: &StructRegistry) -> Result<(), MarshalError> {
        self.ensure_live()?;
        let ty = parse_with(encoding, registry)?;
        self.configure_descriptor(ty)?;
        self.encoding = Some(encoding.to_string());
        Ok(())
    }

    pub fn configure_descriptor(&mut self, ty: TypeDescriptor) -> Result<(), MarshalError> {
        self.ensure_live()?;
        self.unbind();
        self.encoding = Some(ty.encoding());
        self.ty = Some(ty);
        self.state = ArgumentState::Configured;
        Ok(())
    }

    /// Allocate zeroed storage owned by this argument. Storage bound before
    /// is released first; if the allocation then fails the argument is left
    /// configured and unbound.
    pub fn bind(&mut self) -> Result<(), MarshalError> {
        self.ensure_live()?;
        self.configured_type()?;
        if self.storage.is_some() {
            tracing::debug!(encoding = self.encoding.as_deref().unwrap_or(""), "rebinding argument");
            self.unbind();
            self.state = ArgumentState::Configured;
        }
        let storage = StorageAllocator::new().allocate(self.configured_type()?)?;
        self.storage = Some(storage);
        self.state = ArgumentState::Bound;
        Ok(())
    }

    /// Bind to memory owned by the caller, marking this an out-argument.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid for reads and writes of the descriptor's size
    /// for as long as the argument is bound to it.
    pub unsafe fn bind_external(&mut self, ptr: *mut u8) -> Result<(), MarshalError> {
        self.ensure_live()?;
        let storage = StorageAllocator::new().allocate_external(ptr, self.configured_type()?)?;
        self.unbind();
        self.storage = Some(storage);
        self.flags.is_out_argument = true;
        self.state = ArgumentState::Bound;
        Ok(())
    }

    /// Configure and bind in one step.
    pub fn set_type_encoding(&mut self, encoding: &str, registry: &StructRegistry) -> Result<(), MarshalError> {
        self.configure(encoding, registry)?;
        self.bind()
    }

    /// Run `write` against the storage; restore the previous bytes if it
    /// fails. On success the objects now referenced are pinned.
    fn transact<T>(
        &mut self,
        m: &Marshaller,
        write: impl FnOnce(&TypeDescriptor, &mut Storage) -> Result<T, MarshalError>,
    ) -> Result<T, MarshalError> {
        let (ty, storage) = self.parts_mut()?;
        let snapshot = storage.as_bytes().to_vec();
        match write(ty, storage) {
            Ok(result) => {
                let mut pinned = Vec::new();
                m.referenced_objects(ty, storage.as_bytes(), &mut pinned);
                self.pinned = pinned;
                self.state = ArgumentState::ValueSet;
                Ok(result)
            }
            Err(err) => {
                storage.as_bytes_mut().copy_from_slice(&snapshot);
                Err(err)
            }
        }
    }

    pub fn set_value(&mut self, value: &ScriptValue, m: &Marshaller) -> Result<(), MarshalError> {
        self.transact(m, |ty, storage| m.to_native(value, ty, storage.as_bytes_mut()))
    }

    pub fn value(&self, m: &Marshaller) -> Result<ScriptValue, MarshalError> {
        let (ty, storage) = self.parts()?;
        m.to_script(ty, storage.as_bytes())
    }

    /// Take this argument's value from the front of a positional list.
    ///
    /// A struct given as flat values consumes one value per leaf field;
    /// everything else consumes one value. Returns how many were used.
    pub fn set_from_arguments(&mut self, values: &[ScriptValue], m: &Marshaller) -> Result<usize, MarshalError> {
        self.transact(m, |ty, storage| {
            let Some(first) = values.first() else {
                return Err(MarshalError::mismatch(format!("a value for {}", ty.explain()), "no value"));
            };
            match ty {
                TypeDescriptor::Struct(def) if !matches!(first, ScriptValue::Array(_) | ScriptValue::Object(_)) => {
                    let def = m.concrete(def)?;
                    let leaves = def.leaf_count();
                    if values.len() < leaves {
                        return Err(MarshalError::mismatch(
                            format!("{} values for struct {}", leaves, def.name()),
                            format!("{} values", values.len()),
                        ));
                    }
                    storage.zero();
                    let (_, consumed) = struct_to_script(m, storage, &def, Some(&values[..leaves]))?;
                    Ok(consumed)
                }
                _ => {
                    m.to_native(first, ty, storage.as_bytes_mut())?;
                    Ok(1)
                }
            }
        })
    }

    /// Release storage. Any later use fails with `InvalidState`.
    pub fn release(&mut self) -> Result<(), MarshalError> {
        self.ensure_live()?;
        self.unbind();
        self.state = ArgumentState::Released;
        Ok(())
    }
}

impl Default for Argument {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Argument {
    fn drop(&mut self) {
        if self.state != ArgumentState::Released {
            self.unbind();
            self.state = ArgumentState::Released;
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Argument")
            .field("encoding", &self.encoding)
            .field("state", &self.state)
            .field("flags", &self.flags)
            .field("storage", &self.storage)
            .finish()
    }
}
