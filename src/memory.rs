// 實體記憶體存取 - 將模擬器實體位址轉為有長度限制的位元組切片

use crate::error::{Error, Result};
use std::cell::Cell;

pub const VRAM_PADDR: u32 = 0x1800_0000;
pub const VRAM_SIZE: usize = 0x0060_0000; // 6 MB
pub const FCRAM_PADDR: u32 = 0x2000_0000;
pub const FCRAM_SIZE: usize = 0x0800_0000; // 128 MB

/// 實體位址存取介面
pub trait PhysicalMemory {
    /// 取得 [addr, addr + len) 的唯讀切片，無法轉換時回傳錯誤
    fn physical_span(&self, addr: u32, len: usize) -> Result<&[u8]>;
}

#[derive(Debug)]
pub struct MemoryRegion {
    pub name: &'static str,
    pub base: u32,
    pub bytes: Vec<u8>,
}

impl MemoryRegion {
    pub fn new(name: &'static str, base: u32, size: usize) -> Self {
        MemoryRegion {
            name,
            base,
            bytes: vec![0; size],
        }
    }

    fn contains(&self, addr: u32, len: usize) -> Option<std::ops::Range<usize>> {
        let start = addr.checked_sub(self.base)? as usize;
        let end = start.checked_add(len)?;
        if end <= self.bytes.len() {
            Some(start..end)
        } else {
            None
        }
    }
}

/// 由多個具名區塊組成的實體記憶體
#[derive(Debug)]
pub struct PhysicalRam {
    regions: Vec<MemoryRegion>,
    reads: Cell<usize>,
    faults: Cell<usize>,
}

impl PhysicalRam {
    pub fn new() -> Self {
        PhysicalRam {
            regions: Vec::new(),
            reads: Cell::new(0),
            faults: Cell::new(0),
        }
    }

    /// VRAM + 指定大小的 FCRAM
    pub fn with_default_regions(fcram_size: usize) -> Self {
        let mut ram = PhysicalRam::new();
        ram.add_region(MemoryRegion::new("VRAM", VRAM_PADDR, VRAM_SIZE));
        ram.add_region(MemoryRegion::new("FCRAM", FCRAM_PADDR, fcram_size));
        ram
    }

    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    pub fn add_region(&mut self, region: MemoryRegion) {
        self.regions.push(region);
    }

    /// 可寫切片，供前端載入影像或測試填資料
    pub fn span_mut(&mut self, addr: u32, len: usize) -> Result<&mut [u8]> {
        for region in self.regions.iter_mut() {
            if let Some(range) = region.contains(addr, len) {
                return Ok(&mut region.bytes[range]);
            }
        }
        Err(Error::MemoryTranslation { addr, len })
    }

    pub fn write_bytes(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.span_mut(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// 成功的轉換次數
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }

    /// 失敗的轉換次數
    pub fn fault_count(&self) -> usize {
        self.faults.get()
    }
}

impl Default for PhysicalRam {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicalMemory for PhysicalRam {
    fn physical_span(&self, addr: u32, len: usize) -> Result<&[u8]> {
        for region in &self.regions {
            if let Some(range) = region.contains(addr, len) {
                self.reads.set(self.reads.get() + 1);
                return Ok(&region.bytes[range]);
            }
        }
        self.faults.set(self.faults.get() + 1);
        Err(Error::MemoryTranslation { addr, len })
    }
}
