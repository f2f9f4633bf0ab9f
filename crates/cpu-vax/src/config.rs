//! Reset-time configuration.

/// Where the core starts after reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaxConfig {
    /// Initial PC.
    pub reset_pc: u32,
    /// Initial kernel stack pointer.
    pub reset_sp: u32,
    /// System Control Block base address (low two bits ignored).
    pub scbb: u32,
    /// Bytes of flat memory a host should provide.
    pub memory_size: usize,
}

impl Default for VaxConfig {
    fn default() -> Self {
        Self {
            reset_pc: 0x0000_1000,
            reset_sp: 0x0000_F000,
            scbb: 0,
            memory_size: 1 << 20,
        }
    }
}
