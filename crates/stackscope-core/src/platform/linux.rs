//! # Linux Backends
//!
//! [`ProcessMemory`] reads another process's memory with `process_vm_readv`,
//! which needs the same permission as `ptrace` attach but no stop. Partial
//! transfers are reported as failures so that callers see exactly the bytes
//! they asked for or nothing.
//!
//! [`PtraceContext`] fetches the integer register file of a thread that the
//! caller has already attached to and stopped.

use std::io;

use tracing::trace;

use crate::error::Result;
#[cfg(target_arch = "x86_64")]
use crate::error::StackscopeError;
#[cfg(target_arch = "x86_64")]
use crate::provider::ContextSource;
use crate::provider::{read_error, MemoryReader};
use crate::types::Address;
#[cfg(target_arch = "x86_64")]
use crate::types::{RegisterContext, ThreadId, X86_64Register};

/// Memory of a live process, by pid.
#[derive(Debug, Clone, Copy)]
pub struct ProcessMemory
{
    pid: libc::pid_t,
}

impl ProcessMemory
{
    pub fn new(pid: u32) -> Self
    {
        Self { pid: pid as libc::pid_t }
    }

    pub fn pid(&self) -> u32
    {
        self.pid as u32
    }
}

impl MemoryReader for ProcessMemory
{
    fn read(&self, address: Address, buffer: &mut [u8]) -> Result<()>
    {
        if buffer.is_empty() {
            return Ok(());
        }

        let local = libc::iovec {
            iov_base: buffer.as_mut_ptr().cast(),
            iov_len: buffer.len(),
        };
        let remote = libc::iovec {
            iov_base: address.value() as usize as *mut libc::c_void,
            iov_len: buffer.len(),
        };

        // SAFETY: `local` covers exactly `buffer`, which is exclusively borrowed
        // for the duration of the call. The remote range is only dereferenced by
        // the kernel, which validates it against the target's address space.
        let copied = unsafe { libc::process_vm_readv(self.pid, &local, 1, &remote, 1, 0) };

        if copied < 0 {
            let err = io::Error::last_os_error();
            trace!(pid = self.pid, %address, len = buffer.len(), "process_vm_readv failed: {err}");
            return Err(read_error(address, buffer.len()));
        }
        if copied as usize != buffer.len() {
            trace!(pid = self.pid, %address, copied, "short process_vm_readv");
            return Err(read_error(address, buffer.len()));
        }
        Ok(())
    }
}

/// Register capture for ptrace-stopped threads.
#[cfg(target_arch = "x86_64")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PtraceContext;

#[cfg(target_arch = "x86_64")]
impl ContextSource for PtraceContext
{
    fn capture(&self, thread: ThreadId) -> Result<RegisterContext>
    {
        // SAFETY: `user_regs_struct` is plain old data; all-zero is a valid value.
        let mut regs: libc::user_regs_struct = unsafe { std::mem::zeroed() };

        // SAFETY: PTRACE_GETREGS writes one `user_regs_struct` through the data
        // pointer, which points at a live, correctly sized local.
        let rc = unsafe {
            libc::ptrace(
                libc::PTRACE_GETREGS,
                thread.raw() as libc::pid_t,
                std::ptr::null_mut::<libc::c_void>(),
                &mut regs as *mut libc::user_regs_struct as *mut libc::c_void,
            )
        };
        if rc == -1 {
            let err = io::Error::last_os_error();
            return Err(StackscopeError::ContextCapture(format!("PTRACE_GETREGS on thread {thread}: {err}")));
        }

        Ok(from_user_regs(&regs))
    }
}

#[cfg(target_arch = "x86_64")]
fn from_user_regs(regs: &libc::user_regs_struct) -> RegisterContext
{
    use X86_64Register as R;

    let mut context = RegisterContext::new(Address::from(regs.rip), Address::from(regs.rsp), Address::from(regs.rbp));
    context.flags = regs.eflags;
    for (register, value) in [
        (R::Rax, regs.rax),
        (R::Rbx, regs.rbx),
        (R::Rcx, regs.rcx),
        (R::Rdx, regs.rdx),
        (R::Rsi, regs.rsi),
        (R::Rdi, regs.rdi),
        (R::R8, regs.r8),
        (R::R9, regs.r9),
        (R::R10, regs.r10),
        (R::R11, regs.r11),
        (R::R12, regs.r12),
        (R::R13, regs.r13),
        (R::R14, regs.r14),
        (R::R15, regs.r15),
    ] {
        context.set(register, value);
    }
    context
}
