//! # Symbol Session
//!
//! Owns the symbol provider for the lifetime of one debugged process.
//!
//! The provider behaves like a process-wide singleton: it is bound to one target,
//! must be initialised exactly once before any query and finalised exactly once
//! at the end. Instead of ambient global state the session is an explicitly owned
//! value the debug-event loop creates at process start and drops at process exit;
//! stack walks borrow it.
//!
//! ## Lifecycle
//!
//! 1. `SymbolSession::open(provider)` (or `new` + `initialize`)
//! 2. `load_module` / `unload_module` as the target maps images
//! 3. Any number of walks borrowing `&SymbolSession`
//! 4. `finalize()`, or simply drop the session
//!
//! ## Thread Safety
//!
//! The session is **not** thread-safe. Walks against one session must be
//! serialised by the caller (one walk in flight at a time).

use tracing::{debug, warn};

use crate::error::{Result, StackscopeError};
use crate::provider::SymbolProvider;
use crate::types::{Address, ModuleDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState
{
    Created,
    Ready,
    Finalized,
}

/// Lifecycle owner for a [`SymbolProvider`].
pub struct SymbolSession<P: SymbolProvider>
{
    provider: P,
    state: SessionState,
    modules: Vec<ModuleDescriptor>,
}

impl<P: SymbolProvider> SymbolSession<P>
{
    /// Wrap a provider without initialising it.
    pub fn new(provider: P) -> Self
    {
        Self {
            provider,
            state: SessionState::Created,
            modules: Vec::new(),
        }
    }

    /// Wrap and initialise a provider in one step.
    pub fn open(provider: P) -> Result<Self>
    {
        let mut session = Self::new(provider);
        session.initialize()?;
        Ok(session)
    }

    /// Initialise the provider.
    ///
    /// ## Errors
    ///
    /// `SessionAlreadyInitialized` on a second call (also after finalisation; a
    /// session is never reused for another process).
    pub fn initialize(&mut self) -> Result<()>
    {
        if self.state != SessionState::Created {
            return Err(StackscopeError::SessionAlreadyInitialized);
        }
        self.provider.initialize()?;
        self.state = SessionState::Ready;
        debug!("symbol session initialized");
        Ok(())
    }

    /// Finalise the provider. Safe to call once; later calls are errors.
    pub fn finalize(&mut self) -> Result<()>
    {
        if self.state != SessionState::Ready {
            return Err(StackscopeError::SessionNotInitialized);
        }
        self.state = SessionState::Finalized;
        self.modules.clear();
        debug!("symbol session finalized");
        self.provider.finalize()
    }

    /// Returns `true` between initialisation and finalisation.
    pub fn is_ready(&self) -> bool
    {
        self.state == SessionState::Ready
    }

    /// Borrow the provider for queries.
    ///
    /// ## Errors
    ///
    /// `SessionNotInitialized` before `initialize` or after `finalize`.
    pub fn provider(&self) -> Result<&P>
    {
        if self.is_ready() {
            Ok(&self.provider)
        } else {
            Err(StackscopeError::SessionNotInitialized)
        }
    }

    /// Register a module mapped by the target.
    pub fn load_module(&mut self, module: ModuleDescriptor) -> Result<()>
    {
        if !self.is_ready() {
            return Err(StackscopeError::SessionNotInitialized);
        }
        self.provider.load_module(&module)?;
        debug!(name = %module.name, base = %module.base, size = module.size, "module loaded");
        self.modules.retain(|m| m.base != module.base);
        self.modules.push(module);
        Ok(())
    }

    /// Forget the module loaded at `base`.
    pub fn unload_module(&mut self, base: Address) -> Result<()>
    {
        if !self.is_ready() {
            return Err(StackscopeError::SessionNotInitialized);
        }
        let index = self
            .modules
            .iter()
            .position(|m| m.base == base)
            .ok_or(StackscopeError::UnknownModule(base.value()))?;
        self.provider.unload_module(base)?;
        let module = self.modules.remove(index);
        debug!(name = %module.name, base = %module.base, "module unloaded");
        Ok(())
    }

    /// Modules currently loaded, in load order.
    pub fn modules(&self) -> &[ModuleDescriptor]
    {
        &self.modules
    }

    /// Module containing `address`, if any was loaded through this session.
    pub fn module_for(&self, address: Address) -> Option<&ModuleDescriptor>
    {
        self.modules.iter().find(|m| m.contains(address))
    }
}

impl<P: SymbolProvider> Drop for SymbolSession<P>
{
    fn drop(&mut self)
    {
        if self.is_ready() {
            if let Err(err) = self.finalize() {
                warn!("failed to finalize symbol session: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests
{
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::types::{LineInfo, Symbol, SymbolHit, TypeInfo, TypeQuery};

    #[derive(Default)]
    struct Counting
    {
        inits: Rc<Cell<u32>>,
        finals: Rc<Cell<u32>>,
    }

    impl SymbolProvider for Counting
    {
        fn initialize(&mut self) -> Result<()>
        {
            self.inits.set(self.inits.get() + 1);
            Ok(())
        }

        fn finalize(&mut self) -> Result<()>
        {
            self.finals.set(self.finals.get() + 1);
            Ok(())
        }

        fn symbol_at(&self, _: Address) -> Option<SymbolHit>
        {
            None
        }

        fn line_at(&self, _: Address) -> Option<LineInfo>
        {
            None
        }

        fn inline_symbol_at(&self, _: Address, _: u32) -> Option<SymbolHit>
        {
            None
        }

        fn inline_line_at(&self, _: Address, _: u32) -> Option<LineInfo>
        {
            None
        }

        fn type_info(&self, _: Address, _: u32, _: TypeQuery) -> Option<TypeInfo>
        {
            None
        }

        fn locals_at(&self, _: Address, _: &mut dyn FnMut(&Symbol)) {}

        fn inline_locals_at(&self, _: Address, _: u32, _: &mut dyn FnMut(&Symbol)) -> bool
        {
            false
        }

        fn inline_frame_count(&self, _: Address) -> u32
        {
            0
        }

        fn first_inline_context(&self, _: Address) -> Option<u32>
        {
            None
        }
    }

    #[test]
    fn test_initialize_exactly_once()
    {
        let provider = Counting::default();
        let inits = provider.inits.clone();
        let mut session = SymbolSession::open(provider).unwrap();
        assert!(matches!(session.initialize(), Err(StackscopeError::SessionAlreadyInitialized)));
        assert_eq!(inits.get(), 1);
    }

    #[test]
    fn test_query_before_initialize_fails()
    {
        let session = SymbolSession::new(Counting::default());
        assert!(matches!(session.provider(), Err(StackscopeError::SessionNotInitialized)));
    }

    #[test]
    fn test_drop_finalizes_once()
    {
        let provider = Counting::default();
        let finals = provider.finals.clone();
        {
            let mut session = SymbolSession::open(provider).unwrap();
            session.finalize().unwrap();
            assert!(session.finalize().is_err());
            assert!(session.provider().is_err());
        }
        assert_eq!(finals.get(), 1);

        let provider = Counting::default();
        let finals = provider.finals.clone();
        drop(SymbolSession::open(provider).unwrap());
        assert_eq!(finals.get(), 1);
    }

    #[test]
    fn test_module_tracking()
    {
        let mut session = SymbolSession::open(Counting::default()).unwrap();
        session
            .load_module(ModuleDescriptor {
                name: "app.exe".into(),
                base: Address::from(0x1400_0000),
                size: 0x2000,
            })
            .unwrap();
        assert_eq!(session.module_for(Address::from(0x1400_1000)).map(|m| m.name.as_str()), Some("app.exe"));
        session.unload_module(Address::from(0x1400_0000)).unwrap();
        assert!(session.modules().is_empty());
        assert!(matches!(
            session.unload_module(Address::from(0x1400_0000)),
            Err(StackscopeError::UnknownModule(0x1400_0000))
        ));
    }
}
