use parking_lot::RwLock;

pub const SECTION_HEIGHT: i32 = 16;
pub const SECTION_VOLUME: usize = 16 * 16 * 16;
pub const MAX_TYPE_ID: i32 = 0xFFF;

/// Sky light reported for positions inside a section that does not exist.
pub const ABSENT_SKY_LIGHT: i32 = 15;

/// The per-chunk array of optional sections, indexed by `y >> 4`.
pub type Sections = RwLock<Vec<Option<ChunkSection>>>;

pub fn section_index(y: i32) -> i32 {
    y >> 4
}

/// The y coordinate a section holding `y` is anchored at.
pub fn section_base(y: i32) -> i32 {
    section_index(y) << 4
}

/// Packed 4-bit values, two per byte, low nibble first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NibbleArray {
    bytes: Vec<u8>,
}

impl NibbleArray {
    pub fn new(len: usize) -> Self {
        Self::filled(len, 0)
    }

    pub fn filled(len: usize, value: u8) -> Self {
        let value = value & 0xF;
        Self {
            bytes: vec![value | (value << 4); (len + 1) / 2],
        }
    }

    pub fn get(&self, index: usize) -> u8 {
        let byte = self.bytes[index >> 1];
        if index & 1 == 0 {
            byte & 0xF
        } else {
            byte >> 4
        }
    }

    pub fn set(&mut self, index: usize, value: u8) {
        let value = value & 0xF;
        let byte = &mut self.bytes[index >> 1];
        if index & 1 == 0 {
            *byte = (*byte & 0xF0) | value;
        } else {
            *byte = (*byte & 0x0F) | (value << 4);
        }
    }
}

/// A 16x16x16 cube of block storage inside a chunk.
///
/// Block ids are 12 bits wide: the low byte lives in `block_ids`, the high
/// nibble in `ext_ids`, which is only allocated once an id above 255 is
/// written. Metadata and both light channels are nibble arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSection {
    y_base: i32,
    non_empty: u32,
    block_ids: Vec<u8>,
    ext_ids: Option<NibbleArray>,
    data: NibbleArray,
    block_light: NibbleArray,
    sky_light: NibbleArray,
}

impl ChunkSection {
    /// Zero-filled section anchored at `y_base`.
    pub fn new(y_base: i32) -> Self {
        Self {
            y_base,
            non_empty: 0,
            block_ids: vec![0; SECTION_VOLUME],
            ext_ids: None,
            data: NibbleArray::new(SECTION_VOLUME),
            block_light: NibbleArray::new(SECTION_VOLUME),
            sky_light: NibbleArray::new(SECTION_VOLUME),
        }
    }

    pub fn y_base(&self) -> i32 {
        self.y_base
    }

    pub fn is_empty(&self) -> bool {
        self.non_empty == 0
    }

    pub fn non_empty_count(&self) -> u32 {
        self.non_empty
    }

    fn index(x: i32, y: i32, z: i32) -> usize {
        (((y & 15) << 8) | ((z & 15) << 4) | (x & 15)) as usize
    }

    pub fn type_id(&self, x: i32, y: i32, z: i32) -> i32 {
        let index = Self::index(x, y, z);
        let low = self.block_ids[index] as i32;
        match &self.ext_ids {
            Some(ext) => ((ext.get(index) as i32) << 8) | low,
            None => low,
        }
    }

    pub fn set_type_id(&mut self, x: i32, y: i32, z: i32, type_id: i32) {
        let index = Self::index(x, y, z);
        let type_id = type_id & MAX_TYPE_ID;
        let previous = self.type_id(x, y, z);

        self.block_ids[index] = (type_id & 0xFF) as u8;
        let high = (type_id >> 8) as u8;
        if high != 0 {
            self.ext_ids
                .get_or_insert_with(|| NibbleArray::new(SECTION_VOLUME))
                .set(index, high);
        } else if let Some(ext) = self.ext_ids.as_mut() {
            ext.set(index, 0);
        }

        match (previous == 0, type_id == 0) {
            (true, false) => self.non_empty += 1,
            (false, true) => self.non_empty -= 1,
            _ => {}
        }
    }

    pub fn data(&self, x: i32, y: i32, z: i32) -> i32 {
        self.data.get(Self::index(x, y, z)) as i32
    }

    pub fn set_data(&mut self, x: i32, y: i32, z: i32, data: i32) {
        self.data.set(Self::index(x, y, z), data as u8);
    }

    pub fn block_light(&self, x: i32, y: i32, z: i32) -> i32 {
        self.block_light.get(Self::index(x, y, z)) as i32
    }

    pub fn set_block_light(&mut self, x: i32, y: i32, z: i32, level: i32) {
        self.block_light.set(Self::index(x, y, z), level as u8);
    }

    pub fn sky_light(&self, x: i32, y: i32, z: i32) -> i32 {
        self.sky_light.get(Self::index(x, y, z)) as i32
    }

    pub fn set_sky_light(&mut self, x: i32, y: i32, z: i32, level: i32) {
        self.sky_light.set(Self::index(x, y, z), level as u8);
    }
}
