use crate::config::page_remaining;

/// Splits a write into page-bounded program segments.
///
/// Each item is the address a Page Program instruction starts at and the
/// bytes it carries. The first segment may be short when `addr` is not page
/// aligned; every following segment starts on a page boundary and holds at
/// most [`PAGE_SIZE`](crate::config::PAGE_SIZE) bytes.
#[derive(Debug, Clone)]
pub struct PageSegments<'a> {
    addr: u32,
    data: &'a [u8],
}

impl<'a> PageSegments<'a> {
    pub fn new(addr: u32, data: &'a [u8]) -> Self {
        Self { addr, data }
    }
}

impl<'a> Iterator for PageSegments<'a> {
    type Item = (u32, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        let room = page_remaining(self.addr) as usize;
        let (segment, rest) = self.data.split_at(room.min(self.data.len()));
        let addr = self.addr;
        self.addr = self.addr.wrapping_add(segment.len() as u32);
        self.data = rest;
        Some((addr, segment))
    }
}
