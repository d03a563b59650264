//! Physical memory seen by the 8086 core.

/// Size of the real-mode address space
pub const MEMORY_SIZE: usize = 0x10_0000;

/// Memory interface trait for the 8086 CPU
///
/// Systems embedding the core implement this trait to provide the physical
/// address space. Addresses are the raw `(segment << 4) + offset` sum and may
/// run slightly past 1 MiB; what happens there is up to the implementation.
pub trait Memory8086 {
    /// Read a byte from memory at the given address
    fn read(&self, addr: u32) -> u8;

    /// Write a byte to memory at the given address
    fn write(&mut self, addr: u32, val: u8);

    /// Read a little-endian word from two consecutive physical addresses
    fn read_u16(&self, addr: u32) -> u16 {
        let low = self.read(addr) as u16;
        let high = self.read(addr.wrapping_add(1)) as u16;
        (high << 8) | low
    }

    /// Write a little-endian word to two consecutive physical addresses
    fn write_u16(&mut self, addr: u32, val: u16) {
        self.write(addr, val as u8);
        self.write(addr.wrapping_add(1), (val >> 8) as u8);
    }
}

/// Flat 1 MiB backing store
///
/// Reads beyond the array return 0xFF (open bus) and writes there are dropped.
pub struct ArrayMemory {
    data: Vec<u8>,
}

impl ArrayMemory {
    pub fn new() -> Self {
        Self {
            data: vec![0; MEMORY_SIZE],
        }
    }

    /// Load a program at a specific physical address
    ///
    /// Bytes that would land past the end of memory are discarded.
    pub fn load_program(&mut self, addr: u32, program: &[u8]) {
        let start = (addr as usize).min(self.data.len());
        let end = (start + program.len()).min(self.data.len());
        self.data[start..end].copy_from_slice(&program[..end - start]);
    }

    /// Borrow a physical range, clipped to the backing store
    pub fn slice(&self, addr: u32, len: usize) -> &[u8] {
        let start = (addr as usize).min(self.data.len());
        let end = (start + len).min(self.data.len());
        &self.data[start..end]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Default for ArrayMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArrayMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayMemory")
            .field("len", &self.data.len())
            .finish()
    }
}

impl Memory8086 for ArrayMemory {
    fn read(&self, addr: u32) -> u8 {
        self.data.get(addr as usize).copied().unwrap_or(0xFF)
    }

    fn write(&mut self, addr: u32, val: u8) {
        if let Some(cell) = self.data.get_mut(addr as usize) {
            *cell = val;
        }
    }
}
