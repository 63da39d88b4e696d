//! Compact heightfield representation consumed by contour extraction
//!
//! The compact heightfield is a column-oriented voxelization of the walkable
//! surface: each grid cell indexes a contiguous run of walkable spans, and
//! each span carries a height, a region label, an area code and packed
//! connection data for its four horizontal neighbors.

use glam::Vec3;

use navgen_common::{Error, Result};

/// Region id of spans that belong to no region.
pub const NULL_REGION: u16 = 0;

/// Flag bit marking border regions on a region id.
pub const BORDER_REG: u16 = 0x8000;

/// Area code of unwalkable spans.
pub const NULL_AREA: u8 = 0;

/// Checks whether a region id carries the border flag.
#[inline]
pub fn is_border(region: u16) -> bool {
    region & BORDER_REG != 0
}

/// Checks whether a region id is the null region or a border region.
#[inline]
pub fn is_border_or_null(region: u16) -> bool {
    region == NULL_REGION || is_border(region)
}

/// X offset of the neighbor cell in the given direction.
///
/// Directions are fixed: `0 = -X`, `1 = +Z`, `2 = +X`, `3 = -Z`; rotating
/// `(dir + 1) & 3` turns clockwise when looking down the Y axis.
#[inline]
pub fn dir_offset_x(dir: i32) -> i32 {
    const OFFSET: [i32; 4] = [-1, 0, 1, 0];
    OFFSET[(dir & 0x3) as usize]
}

/// Z offset of the neighbor cell in the given direction.
#[inline]
pub fn dir_offset_z(dir: i32) -> i32 {
    const OFFSET: [i32; 4] = [0, 1, 0, -1];
    OFFSET[(dir & 0x3) as usize]
}

/// Provides information on the content of one cell column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompactCell {
    /// Index of the first span in the column.
    index: u32,
    /// Number of spans in the column.
    count: u8,
}

impl CompactCell {
    /// Index of the first span in the column.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Number of spans in the column.
    pub fn count(&self) -> u8 {
        self.count
    }
}

/// A walkable span in a compact heightfield column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSpan {
    /// The lower extent of the span, measured from the heightfield base.
    pub y: u16,
    /// The id of the region the span belongs to.
    pub region: u16,
    /// Packed neighbor connection data, 6 bits per direction.
    con: u32,
}

impl Default for CompactSpan {
    fn default() -> Self {
        Self::new(0, NULL_REGION)
    }
}

impl CompactSpan {
    /// Sentinel for an absent neighbor connection.
    pub const NOT_CONNECTED: u8 = 0x3f;

    /// Creates a span with no neighbor connections.
    pub fn new(y: u16, region: u16) -> Self {
        Self {
            y,
            region,
            // All four directions start out as NOT_CONNECTED.
            con: 0x00ff_ffff,
        }
    }

    /// Returns the connection offset into the neighbor cell for the given
    /// direction, or `None` if the edge has no neighbor.
    pub fn con(&self, dir: i32) -> Option<u8> {
        let shift = (dir & 0x3) as u32 * 6;
        let value = ((self.con >> shift) & Self::NOT_CONNECTED as u32) as u8;
        if value == Self::NOT_CONNECTED {
            None
        } else {
            Some(value)
        }
    }

    /// Sets the connection offset for the given direction.
    pub fn set_con(&mut self, dir: i32, neighbor: impl Into<Option<u8>>) {
        let shift = (dir & 0x3) as u32 * 6;
        let value =
            neighbor.into().unwrap_or(Self::NOT_CONNECTED) as u32 & Self::NOT_CONNECTED as u32;
        self.con = (self.con & !(0x3f << shift)) | (value << shift);
    }
}

/// One walkable span of input for [`CompactHeightfield::from_spans`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanData {
    /// Cell X coordinate.
    pub x: i32,
    /// Cell Z coordinate.
    pub z: i32,
    /// Lower extent of the span.
    pub y: u16,
    /// Region id.
    pub region: u16,
    /// Area code.
    pub area: u8,
}

impl SpanData {
    /// Creates a new span record.
    pub fn new(x: i32, z: i32, y: u16, region: u16, area: u8) -> Self {
        Self {
            x,
            z,
            y,
            region,
            area,
        }
    }
}

/// Compact heightfield structure
///
/// Read-only from the point of view of contour extraction; the builder only
/// queries cells, spans, areas and connection data.
#[derive(Debug, Clone)]
pub struct CompactHeightfield {
    /// Width of the heightfield along the x-axis.
    pub width: i32,
    /// Height (depth) of the heightfield along the z-axis.
    pub height: i32,
    /// Size of the non-navigable border around the heightfield, in cells.
    pub border_size: i32,
    /// The minimum bounds of the heightfield's AABB.
    pub bmin: Vec3,
    /// The maximum bounds of the heightfield's AABB.
    pub bmax: Vec3,
    /// Cell size (horizontal resolution).
    pub cs: f32,
    /// Cell height (vertical resolution).
    pub ch: f32,
    /// Grid of cell columns, `width * height`, row-major.
    pub cells: Vec<CompactCell>,
    /// Walkable spans, grouped per column.
    pub spans: Vec<CompactSpan>,
    /// Area code per span.
    pub areas: Vec<u8>,
    /// One past the highest region id in use, border flag masked off.
    pub max_regions: u16,
}

impl CompactHeightfield {
    /// Builds a compact heightfield from a flat list of walkable spans.
    ///
    /// Spans may be given in any order; columns are laid out row-major and
    /// sorted by height, and axis-neighbor connections are resolved between
    /// the closest spans of adjacent columns. Cells without spans stay empty,
    /// which downstream stages read as unwalkable.
    pub fn from_spans(
        width: i32,
        height: i32,
        bmin: Vec3,
        bmax: Vec3,
        cs: f32,
        ch: f32,
        border_size: i32,
        input: &[SpanData],
    ) -> Result<Self> {
        if width <= 0 || height <= 0 {
            return Err(Error::InvalidInput(format!(
                "invalid grid size: {}x{}",
                width, height
            )));
        }
        if cs <= 0.0 || ch <= 0.0 {
            return Err(Error::InvalidInput(format!(
                "invalid cell resolution: cs={}, ch={}",
                cs, ch
            )));
        }
        if border_size < 0 || border_size * 2 > width.min(height) {
            return Err(Error::InvalidInput(format!(
                "border size {} does not fit a {}x{} grid",
                border_size, width, height
            )));
        }

        let cell_count = (width * height) as usize;
        let mut columns: Vec<Vec<(u16, u16, u8)>> = vec![Vec::new(); cell_count];
        for s in input {
            if s.x < 0 || s.x >= width || s.z < 0 || s.z >= height {
                return Err(Error::InvalidInput(format!(
                    "span position out of bounds: ({}, {})",
                    s.x, s.z
                )));
            }
            columns[(s.z * width + s.x) as usize].push((s.y, s.region, s.area));
        }

        let mut cells = Vec::with_capacity(cell_count);
        let mut spans = Vec::with_capacity(input.len());
        let mut areas = Vec::with_capacity(input.len());
        for column in columns.iter_mut() {
            if column.len() >= CompactSpan::NOT_CONNECTED as usize {
                return Err(Error::InvalidInput(format!(
                    "too many spans in one column: {}",
                    column.len()
                )));
            }
            column.sort_unstable_by_key(|&(y, _, _)| y);
            cells.push(CompactCell {
                index: spans.len() as u32,
                count: column.len() as u8,
            });
            for &(y, region, area) in column.iter() {
                spans.push(CompactSpan::new(y, region));
                areas.push(area);
            }
        }

        let max_regions = spans
            .iter()
            .map(|s| s.region & !BORDER_REG)
            .max()
            .map_or(0, |m| m + 1);

        let mut chf = Self {
            width,
            height,
            border_size,
            bmin,
            bmax,
            cs,
            ch,
            cells,
            spans,
            areas,
            max_regions,
        };
        chf.build_connections();
        Ok(chf)
    }

    /// Resolves axis-neighbor connections between the spans of adjacent
    /// columns. Each span links to the neighbor span closest in height;
    /// vertical reachability filtering is the upstream voxelizer's concern.
    fn build_connections(&mut self) {
        for z in 0..self.height {
            for x in 0..self.width {
                let cell = self.cells[(z * self.width + x) as usize];
                for i in cell.index as usize..cell.index as usize + cell.count as usize {
                    let y = self.spans[i].y;
                    for dir in 0..4 {
                        let nx = x + dir_offset_x(dir);
                        let nz = z + dir_offset_z(dir);
                        if nx < 0 || nz < 0 || nx >= self.width || nz >= self.height {
                            continue;
                        }
                        let ncell = self.cells[(nz * self.width + nx) as usize];
                        let mut best: Option<(u8, u16)> = None;
                        for k in 0..ncell.count {
                            let ny = self.spans[ncell.index as usize + k as usize].y;
                            let diff = ny.abs_diff(y);
                            if best.map_or(true, |(_, d)| diff < d) {
                                best = Some((k, diff));
                            }
                        }
                        self.spans[i].set_con(dir, best.map(|(k, _)| k));
                    }
                }
            }
        }
    }

    /// The cell column at `(x, z)`.
    #[inline]
    pub fn cell(&self, x: i32, z: i32) -> &CompactCell {
        &self.cells[(z * self.width + x) as usize]
    }

    /// Span index of the neighbor connected across edge `dir` of span
    /// `span_index` located at cell `(x, z)`, or `None` if the edge has no
    /// neighbor.
    pub fn connection(&self, x: i32, z: i32, span_index: usize, dir: i32) -> Option<usize> {
        let offset = self.spans[span_index].con(dir)?;
        let nx = x + dir_offset_x(dir);
        let nz = z + dir_offset_z(dir);
        if nx < 0 || nz < 0 || nx >= self.width || nz >= self.height {
            return None;
        }
        Some(self.cells[(nz * self.width + nx) as usize].index as usize + offset as usize)
    }

    /// Total number of spans.
    pub fn span_count(&self) -> usize {
        self.spans.len()
    }
}
