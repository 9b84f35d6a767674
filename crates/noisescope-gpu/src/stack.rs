//! Linear sub-allocation of GPU buffers.
//!
//! A [`MemoryStack`] owns one large buffer created up front and hands out
//! [`MemoryRegion`]s by bumping a cursor. Regions are never freed; they live
//! as long as the application. [`GpuArray`] adds an append-only element count
//! on top of a region.

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::memory::GpuBuffer;
use ash::vk;
use gpu_allocator::MemoryLocation;
use std::marker::PhantomData;

/// Where a stack's backing memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Host-visible, coherent; written through a mapping.
    Host,
    /// Device-local; written through the staging path.
    Device,
}

impl Visibility {
    /// Memory property flags a backing allocation must provide.
    pub fn required_flags(self) -> vk::MemoryPropertyFlags {
        match self {
            Self::Host => {
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
            }
            Self::Device => vk::MemoryPropertyFlags::DEVICE_LOCAL,
        }
    }

    fn location(self) -> MemoryLocation {
        match self {
            Self::Host => MemoryLocation::CpuToGpu,
            Self::Device => MemoryLocation::GpuOnly,
        }
    }
}

/// Description of a stack's backing buffer.
#[derive(Debug, Clone)]
pub struct StackDesc {
    pub name: &'static str,
    pub size: u64,
    pub usage: vk::BufferUsageFlags,
    pub visibility: Visibility,
}

/// Round `cursor` up to the next multiple of `align`.
///
/// An alignment of 0 is treated as 1.
pub const fn align_offset(cursor: u64, align: u64) -> u64 {
    let align = if align == 0 { 1 } else { align };
    let overflow = cursor % align;
    if overflow == 0 {
        cursor
    } else {
        cursor + (align - overflow)
    }
}

/// Bump cursor over a fixed byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackCursor {
    count: u64,
    size: u64,
}

impl StackCursor {
    /// A zeroed cursor over `size` bytes.
    pub const fn new(size: u64) -> Self {
        Self { count: 0, size }
    }

    /// Reserve `size` bytes at the next offset aligned to `align`.
    ///
    /// On overflow the cursor is left unchanged.
    pub fn allocate(&mut self, size: u64, align: u64) -> Result<u64> {
        let offset = align_offset(self.count, align);
        let end = offset.saturating_add(size);
        if end > self.size {
            return Err(GpuError::StackOverflow {
                size,
                align,
                offset,
                capacity: self.size,
                overflow: end - self.size,
            });
        }

        self.count = end;
        Ok(offset)
    }

    /// Bytes reserved so far.
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Total bytes available.
    pub const fn size(&self) -> u64 {
        self.size
    }
}

/// A fixed sub-range of a stack's backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    pub buffer: vk::Buffer,
    pub offset: u64,
    pub size: u64,
    pub visibility: Visibility,
}

/// A bump allocator over one real GPU buffer.
pub struct MemoryStack {
    buffer: GpuBuffer,
    cursor: StackCursor,
    visibility: Visibility,
    name: &'static str,
}

impl MemoryStack {
    /// Create the backing buffer described by `desc`.
    ///
    /// Fails if the device has no memory type with the flags `desc.visibility`
    /// requires.
    pub fn create(ctx: &GpuContext, desc: &StackDesc) -> Result<Self> {
        let flags = desc.visibility.required_flags();
        ctx.capabilities().find_memory_type(u32::MAX, flags)?;

        let buffer = ctx.allocator().lock().create_buffer(
            desc.size,
            desc.usage,
            desc.visibility.location(),
            desc.name,
        )?;

        if desc.visibility == Visibility::Host && buffer.mapped_ptr().is_none() {
            return Err(GpuError::InvalidState(format!(
                "host stack '{}' is not mapped",
                desc.name
            )));
        }

        tracing::info!(
            "Created {:?} memory stack '{}' ({} MiB)",
            desc.visibility,
            desc.name,
            desc.size / (1024 * 1024)
        );

        Ok(Self {
            buffer,
            cursor: StackCursor::new(desc.size),
            visibility: desc.visibility,
            name: desc.name,
        })
    }

    /// Reserve `size` bytes aligned to `align`.
    pub fn allocate(&mut self, size: u64, align: u64) -> Result<MemoryRegion> {
        let offset = self.cursor.allocate(size, align)?;
        tracing::debug!(
            "stack '{}': {size} bytes at offset {offset} (align {align})",
            self.name
        );

        Ok(MemoryRegion {
            buffer: self.buffer.buffer,
            offset,
            size,
            visibility: self.visibility,
        })
    }

    /// Reserve room for `capacity` elements of `T`.
    pub fn create_array<T: bytemuck::Pod>(
        &mut self,
        capacity: u32,
        align: u64,
    ) -> Result<GpuArray<T>> {
        let size = u64::from(capacity) * std::mem::size_of::<T>() as u64;
        let region = self.allocate(size, align)?;
        Ok(GpuArray::new(region, capacity))
    }

    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Bytes reserved so far.
    pub const fn count(&self) -> u64 {
        self.cursor.count()
    }

    /// Total size of the backing buffer.
    pub const fn size(&self) -> u64 {
        self.cursor.size()
    }

    /// The backing buffer.
    pub const fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    /// Release the backing buffer.
    pub fn destroy(&mut self, ctx: &GpuContext) -> Result<()> {
        ctx.allocator().lock().free_buffer(&mut self.buffer)
    }
}

/// A typed, append-only view of a region.
#[derive(Debug)]
pub struct GpuArray<T> {
    region: MemoryRegion,
    count: u32,
    capacity: u32,
    _marker: PhantomData<T>,
}

impl<T: bytemuck::Pod> GpuArray<T> {
    pub(crate) const fn new(region: MemoryRegion, capacity: u32) -> Self {
        Self {
            region,
            count: 0,
            capacity,
            _marker: PhantomData,
        }
    }

    /// Fail with [`GpuError::ArrayOverflow`] if `pushed` more elements do
    /// not fit. Never changes the count.
    pub fn check_push(&self, pushed: u32) -> Result<()> {
        let total = u64::from(self.count) + u64::from(pushed);
        if total > u64::from(self.capacity) {
            return Err(GpuError::ArrayOverflow {
                pushed,
                count: self.count,
                capacity: self.capacity,
                overflow: (total - u64::from(self.capacity)) as u32,
            });
        }
        Ok(())
    }

    /// Reserve `pushed` more elements, returning the index of the first.
    ///
    /// The count is left unchanged when the push would exceed capacity.
    pub fn reserve(&mut self, pushed: u32) -> Result<u32> {
        self.check_push(pushed)?;

        let start = self.count;
        self.count += pushed;
        Ok(start)
    }

    /// Byte offset of element `index` inside the backing buffer.
    pub fn byte_offset(&self, index: u32) -> u64 {
        self.region.offset + u64::from(index) * Self::stride()
    }

    /// Size of one element in bytes.
    pub fn stride() -> u64 {
        std::mem::size_of::<T>() as u64
    }

    /// Forget all pushed elements.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    pub const fn count(&self) -> u32 {
        self.count
    }

    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Elements that can still be pushed.
    pub const fn remaining(&self) -> u32 {
        self.capacity - self.count
    }

    pub const fn region(&self) -> &MemoryRegion {
        &self.region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(size: u64) -> MemoryRegion {
        MemoryRegion {
            buffer: vk::Buffer::null(),
            offset: 64,
            size,
            visibility: Visibility::Device,
        }
    }

    #[test]
    fn align_offset_rounds_up() {
        assert_eq!(align_offset(0, 16), 0);
        assert_eq!(align_offset(1, 16), 16);
        assert_eq!(align_offset(600, 16), 608);
        assert_eq!(align_offset(608, 16), 608);
        assert_eq!(align_offset(7, 1), 7);
        assert_eq!(align_offset(7, 0), 7);
    }

    #[test]
    fn cursor_advances_to_aligned_end() {
        let mut cursor = StackCursor::new(256);
        assert_eq!(cursor.allocate(10, 4).unwrap(), 0);
        assert_eq!(cursor.count(), 10);
        assert_eq!(cursor.allocate(20, 16).unwrap(), 16);
        assert_eq!(cursor.count(), 36);
        assert_eq!(cursor.allocate(4, 1).unwrap(), 36);
        assert_eq!(cursor.count(), 40);
    }

    #[test]
    fn overflowing_allocation_reports_amounts() {
        let mut cursor = StackCursor::new(1024);
        assert_eq!(cursor.allocate(600, 16).unwrap(), 0);

        let err = cursor.allocate(500, 16).unwrap_err();
        match err {
            GpuError::StackOverflow {
                size,
                align,
                offset,
                capacity,
                overflow,
            } => {
                assert_eq!(size, 500);
                assert_eq!(align, 16);
                assert_eq!(offset, 608);
                assert_eq!(capacity, 1024);
                assert_eq!(overflow, 84);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(cursor.count(), 600);
    }

    #[test]
    fn allocation_law_holds_for_mixed_requests() {
        let requests = [(100, 8), (3, 1), (64, 64), (900, 32), (1, 256), (16, 16)];
        let mut cursor = StackCursor::new(1200);

        for (size, align) in requests {
            let before = cursor.count();
            let expected = align_offset(before, align);
            match cursor.allocate(size, align) {
                Ok(offset) => {
                    assert!(expected + size <= 1200);
                    assert_eq!(offset, expected);
                    assert_eq!(cursor.count(), expected + size);
                }
                Err(_) => {
                    assert!(expected + size > 1200);
                    assert_eq!(cursor.count(), before);
                }
            }
        }
    }

    #[test]
    fn exact_fit_succeeds() {
        let mut cursor = StackCursor::new(64);
        cursor.allocate(32, 1).unwrap();
        assert_eq!(cursor.allocate(32, 32).unwrap(), 32);
        assert!(cursor.allocate(1, 1).is_err());
    }

    #[test]
    fn array_push_prefix_law() {
        let mut array = GpuArray::<u32>::new(region(40), 10);
        assert_eq!(array.reserve(4).unwrap(), 0);
        assert_eq!(array.reserve(6).unwrap(), 4);
        assert_eq!(array.count(), 10);

        let err = array.reserve(1).unwrap_err();
        assert!(matches!(
            err,
            GpuError::ArrayOverflow {
                pushed: 1,
                count: 10,
                capacity: 10,
                overflow: 1
            }
        ));
        assert_eq!(array.count(), 10);
    }

    #[test]
    fn failed_push_leaves_array_untouched() {
        let mut array = GpuArray::<u8>::new(region(8), 8);
        array.reserve(5).unwrap();
        assert!(array.reserve(4).is_err());
        assert_eq!(array.count(), 5);
        assert_eq!(array.reserve(3).unwrap(), 5);
    }

    #[test]
    fn check_push_does_not_reserve() {
        let mut array = GpuArray::<u32>::new(region(24), 6);
        array.reserve(4).unwrap();

        array.check_push(2).unwrap();
        assert!(matches!(
            array.check_push(3).unwrap_err(),
            GpuError::ArrayOverflow {
                pushed: 3,
                count: 4,
                capacity: 6,
                overflow: 1
            }
        ));
        assert_eq!(array.count(), 4);
        assert_eq!(array.remaining(), 2);
    }

    #[test]
    fn byte_offsets_include_region_offset() {
        let mut array = GpuArray::<[f32; 5]>::new(region(200), 10);
        assert_eq!(GpuArray::<[f32; 5]>::stride(), 20);
        assert_eq!(array.byte_offset(0), 64);
        assert_eq!(array.byte_offset(3), 124);

        array.reserve(2).unwrap();
        array.clear();
        assert_eq!(array.count(), 0);
    }

    #[test]
    fn visibility_flags() {
        assert!(Visibility::Host
            .required_flags()
            .contains(vk::MemoryPropertyFlags::HOST_VISIBLE));
        assert_eq!(
            Visibility::Device.required_flags(),
            vk::MemoryPropertyFlags::DEVICE_LOCAL
        );
    }
}
