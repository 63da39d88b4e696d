//! Contour extraction from a region-labeled compact heightfield
//!
//! Walks the boundary of every region, simplifies the resulting raw vertex
//! rings into polylines within an error tolerance, and merges inside-out
//! (hole) rings into their enclosing contour. The output contour set is the
//! input for polygon-mesh construction.

use glam::Vec3;

use navgen_common::{
    distance_pt_seg_sqr_2d, left_on_2d, next_index, prev_index, Result,
};

use super::compact_heightfield::{
    dir_offset_x, dir_offset_z, is_border_or_null, CompactHeightfield, BORDER_REG, NULL_REGION,
};
use super::config::{ContourBuildFlags, ContourConfig};

/// Flag on a vertex `data` field marking a corner on the removable
/// exterior/interior border pattern.
pub const BORDER_VERTEX: i32 = 0x10000;

/// Flag on a vertex `data` field marking an edge between different area codes.
pub const AREA_BORDER: i32 = 0x20000;

/// Mask extracting the neighbor region id from a vertex `data` field.
pub const CONTOUR_REG_MASK: i32 = 0xffff;

/// Safety cap on boundary-walk iterations per ring, guards malformed input.
const MAX_WALK_ITERATIONS: i32 = 40_000;

/// A vertex in a contour
///
/// `x` and `z` are voxel-corner coordinates, `y` is the resolved corner
/// height. For raw vertices `data` packs the neighbor region id with the
/// [`BORDER_VERTEX`] and [`AREA_BORDER`] flags; for simplified vertices the
/// same layout applies after the build finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContourVertex {
    /// X-coordinate (cell units)
    pub x: i32,
    /// Y-coordinate (height units)
    pub y: i32,
    /// Z-coordinate (cell units)
    pub z: i32,
    /// Packed neighbor region id and flag bits
    pub data: i32,
}

impl ContourVertex {
    /// Creates a new contour vertex
    pub fn new(x: i32, y: i32, z: i32, data: i32) -> Self {
        Self { x, y, z, data }
    }

    /// The neighbor region across the edge starting at this vertex.
    pub fn region(&self) -> u16 {
        (self.data & CONTOUR_REG_MASK) as u16
    }

    /// Whether this corner lies on the removable border pattern.
    pub fn is_border_vertex(&self) -> bool {
        self.data & BORDER_VERTEX != 0
    }

    /// Whether the edge starting at this vertex separates different areas.
    pub fn is_area_border(&self) -> bool {
        self.data & AREA_BORDER != 0
    }
}

/// A closed boundary ring of one region
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    /// Simplified vertices of the contour
    pub vertices: Vec<ContourVertex>,
    /// Raw vertices of the contour, one per boundary edge
    pub raw_vertices: Vec<ContourVertex>,
    /// Region id of the contour
    pub region: u16,
    /// Area code of the contour
    pub area: u8,
}

impl Contour {
    /// Number of simplified vertices
    pub fn nverts(&self) -> usize {
        self.vertices.len()
    }

    /// Number of raw vertices
    pub fn nraw_verts(&self) -> usize {
        self.raw_vertices.len()
    }
}

/// A set of contours
#[derive(Debug, Clone, PartialEq)]
pub struct ContourSet {
    /// Contours in the set
    pub contours: Vec<Contour>,
    /// The minimum bounds of the heightfield's AABB, border removed
    pub bmin: Vec3,
    /// The maximum bounds of the heightfield's AABB, border removed
    pub bmax: Vec3,
    /// Cell size (horizontal resolution)
    pub cs: f32,
    /// Cell height (vertical resolution)
    pub ch: f32,
    /// Width of the set, border removed
    pub width: i32,
    /// Height of the set, border removed
    pub height: i32,
    /// Border size used during generation
    pub border_size: i32,
    /// Maximum edge error of the simplification
    pub max_error: f32,
}

impl ContourSet {
    /// Builds contours from a region-labeled compact heightfield.
    ///
    /// Rings whose simplified form has fewer than three vertices are
    /// dropped; holes without a mergeable outer contour are kept as-is.
    /// The heightfield is only read and is not retained.
    pub fn build(chf: &CompactHeightfield, config: &ContourConfig) -> Result<Self> {
        config.validate()?;

        let w = chf.width;
        let h = chf.height;
        let border_size = chf.border_size;

        let mut bmin = chf.bmin;
        let mut bmax = chf.bmax;
        if border_size > 0 {
            let pad = border_size as f32 * chf.cs;
            bmin.x += pad;
            bmin.z += pad;
            bmax.x -= pad;
            bmax.z -= pad;
        }

        let mut flags = build_edge_flags(chf);
        let boundary_spans = flags.iter().filter(|&&f| f != 0 && f != 0xf).count();
        log::debug!(
            "contour build: {}x{} cells, {} spans ({} on a region boundary), {} regions",
            w,
            h,
            chf.span_count(),
            boundary_spans,
            chf.max_regions
        );

        let mut contours = Vec::new();
        let mut verts: Vec<ContourVertex> = Vec::new();
        let mut simplified: Vec<ContourVertex> = Vec::new();
        let mut dropped = 0usize;

        for z in 0..h {
            for x in 0..w {
                let cell = *chf.cell(x, z);
                for i in cell.index() as usize..cell.index() as usize + cell.count() as usize {
                    if flags[i] == 0 || flags[i] == 0xf {
                        flags[i] = 0;
                        continue;
                    }
                    let region = chf.spans[i].region;
                    if is_border_or_null(region) {
                        continue;
                    }
                    let area = chf.areas[i];

                    verts.clear();
                    simplified.clear();
                    if !walk_contour(chf, x, z, i, &mut flags, &mut verts) {
                        dropped += 1;
                        continue;
                    }
                    simplify_contour(
                        &verts,
                        &mut simplified,
                        config.max_error,
                        config.max_edge_len,
                        config.flags,
                    );
                    remove_degenerate_segments(&mut simplified);

                    if simplified.len() < 3 {
                        dropped += 1;
                        continue;
                    }

                    let mut contour = Contour {
                        vertices: simplified.clone(),
                        raw_vertices: verts.clone(),
                        region,
                        area,
                    };
                    if border_size > 0 {
                        for v in contour.vertices.iter_mut() {
                            v.x -= border_size;
                            v.z -= border_size;
                        }
                        for v in contour.raw_vertices.iter_mut() {
                            v.x -= border_size;
                            v.z -= border_size;
                        }
                    }
                    contours.push(contour);
                }
            }
        }

        merge_region_holes(&mut contours);

        log::debug!(
            "contour build: {} contours stored, {} rings dropped",
            contours.len(),
            dropped
        );

        Ok(Self {
            contours,
            bmin,
            bmax,
            cs: chf.cs,
            ch: chf.ch,
            width: w - border_size * 2,
            height: h - border_size * 2,
            border_size,
            max_error: config.max_error,
        })
    }
}

/// Computes the per-span boundary-edge masks.
///
/// Bit `d` is set when edge `d` of the span faces a different region
/// (including absent neighbors). Null- and border-region spans get `0`;
/// fully isolated spans end up as `0xf` and are skipped by the driver.
fn build_edge_flags(chf: &CompactHeightfield) -> Vec<u8> {
    let mut flags = vec![0u8; chf.span_count()];
    for z in 0..chf.height {
        for x in 0..chf.width {
            let cell = *chf.cell(x, z);
            for i in cell.index() as usize..cell.index() as usize + cell.count() as usize {
                let region = chf.spans[i].region;
                if is_border_or_null(region) {
                    flags[i] = 0;
                    continue;
                }
                let mut internal = 0u8;
                for dir in 0..4 {
                    let mut r = NULL_REGION;
                    if let Some(ai) = chf.connection(x, z, i, dir) {
                        r = chf.spans[ai].region;
                    }
                    if r == region {
                        internal |= 1 << dir;
                    }
                }
                // Inverse: mark edges facing another region.
                flags[i] = internal ^ 0xf;
            }
        }
    }
    flags
}

/// Resolves the height of the voxel corner at the clockwise end of edge
/// `dir`, together with whether it lies on the removable border pattern.
///
/// The corner is shared by up to four spans; its height is the maximum of
/// their lower extents. The pattern check needs region and area of each of
/// the four slots, packed as `region | (area << 16)`.
fn get_corner_height(
    chf: &CompactHeightfield,
    x: i32,
    z: i32,
    i: usize,
    dir: i32,
) -> (i32, bool) {
    let dirp = (dir + 1) & 0x3;
    let mut height = chf.spans[i].y as i32;
    let mut regs = [0u32; 4];

    // Combined region and area codes so border vertices between areas are
    // kept apart.
    regs[0] = chf.spans[i].region as u32 | ((chf.areas[i] as u32) << 16);

    if let Some(ai) = chf.connection(x, z, i, dir) {
        let ax = x + dir_offset_x(dir);
        let az = z + dir_offset_z(dir);
        height = height.max(chf.spans[ai].y as i32);
        regs[1] = chf.spans[ai].region as u32 | ((chf.areas[ai] as u32) << 16);
        if let Some(ai2) = chf.connection(ax, az, ai, dirp) {
            height = height.max(chf.spans[ai2].y as i32);
            regs[2] = chf.spans[ai2].region as u32 | ((chf.areas[ai2] as u32) << 16);
        }
    }
    if let Some(ai) = chf.connection(x, z, i, dirp) {
        let ax = x + dir_offset_x(dirp);
        let az = z + dir_offset_z(dirp);
        height = height.max(chf.spans[ai].y as i32);
        regs[3] = chf.spans[ai].region as u32 | ((chf.areas[ai] as u32) << 16);
        if let Some(ai2) = chf.connection(ax, az, ai, dir) {
            height = height.max(chf.spans[ai2].y as i32);
            regs[2] = chf.spans[ai2].region as u32 | ((chf.areas[ai2] as u32) << 16);
        }
    }

    // The vertex is a border vertex when two identical exterior slots in a
    // row are followed by two interior slots of the same area and no slot
    // is out of bounds.
    let mut is_border_vertex = false;
    for j in 0..4 {
        let a = j;
        let b = (j + 1) & 0x3;
        let c = (j + 2) & 0x3;
        let d = (j + 3) & 0x3;

        let two_same_exts =
            (regs[a] & regs[b] & BORDER_REG as u32) != 0 && regs[a] == regs[b];
        let two_ints = ((regs[c] | regs[d]) & BORDER_REG as u32) == 0;
        let ints_same_area = (regs[c] >> 16) == (regs[d] >> 16);
        let no_zeros = regs[a] != 0 && regs[b] != 0 && regs[c] != 0 && regs[d] != 0;

        if two_same_exts && two_ints && ints_same_area && no_zeros {
            is_border_vertex = true;
            break;
        }
    }

    (height, is_border_vertex)
}

/// Traces one closed ring of raw vertices around a region boundary.
///
/// Wall-follow, emitting clockwise when viewed from +Y: a set flag emits
/// the edge corner and turns clockwise, a clear flag steps into the
/// neighbor and turns counter-clockwise. Consumed edge bits are cleared in
/// `flags` so each boundary edge contributes exactly one vertex across the
/// build.
///
/// Returns `false` when a required neighbor connection is missing, which
/// aborts the ring (malformed input).
fn walk_contour(
    chf: &CompactHeightfield,
    mut x: i32,
    mut z: i32,
    mut i: usize,
    flags: &mut [u8],
    points: &mut Vec<ContourVertex>,
) -> bool {
    debug_assert!(flags[i] != 0, "walk must start on a boundary span");

    // Start at the first boundary edge.
    let mut dir = 0i32;
    while flags[i] & (1 << dir) == 0 {
        dir += 1;
    }
    let start_dir = dir;
    let start_i = i;
    let area = chf.areas[i];

    let mut iter = 0;
    while iter < MAX_WALK_ITERATIONS {
        iter += 1;

        if flags[i] & (1 << dir) != 0 {
            // Emit the corner at the clockwise end of this edge.
            let (py, is_border_vertex) = get_corner_height(chf, x, z, i, dir);
            let mut px = x;
            let mut pz = z;
            match dir {
                0 => pz += 1,
                1 => {
                    px += 1;
                    pz += 1;
                }
                2 => px += 1,
                _ => {}
            }

            let mut r = 0i32;
            if let Some(ai) = chf.connection(x, z, i, dir) {
                r = chf.spans[ai].region as i32;
                if chf.areas[ai] != area {
                    r |= AREA_BORDER;
                }
            }
            if is_border_vertex {
                r |= BORDER_VERTEX;
            }
            points.push(ContourVertex::new(px, py, pz, r));

            flags[i] &= !(1 << dir);
            dir = (dir + 1) & 0x3; // Rotate CW
        } else {
            match chf.connection(x, z, i, dir) {
                Some(ni) => {
                    x += dir_offset_x(dir);
                    z += dir_offset_z(dir);
                    i = ni;
                    dir = (dir + 3) & 0x3; // Rotate CCW
                }
                None => {
                    // An internal edge must have a neighbor; the ring is
                    // unusable.
                    log::warn!(
                        "contour walk aborted at ({}, {}) dir {}: missing connection",
                        x,
                        z,
                        dir
                    );
                    return false;
                }
            }
        }

        if i == start_i && dir == start_dir {
            break;
        }
    }
    true
}

/// Reduces a raw vertex ring to a simplified polyline.
///
/// Portal transitions seed the simplified ring (or the two lex-extreme
/// vertices when the ring has no portals at all); raw vertices on outer
/// walls and area borders are then re-inserted until every one of them is
/// within `max_error` of its simplified edge. When `max_edge_len` is
/// positive, overlong wall and area edges are split at their raw midpoint
/// according to the build flags. During the passes the `data` field holds
/// the source raw index; the final pass rewrites it to the packed region
/// and flag bits.
fn simplify_contour(
    points: &[ContourVertex],
    simplified: &mut Vec<ContourVertex>,
    max_error: f32,
    max_edge_len: i32,
    flags: ContourBuildFlags,
) {
    let pn = points.len();
    if pn == 0 {
        return;
    }

    // Portal seeds: one vertex at every location where the neighbor region
    // or the area-border flag changes.
    let has_connections = points.iter().any(|p| p.data & CONTOUR_REG_MASK != 0);
    if has_connections {
        for i in 0..pn {
            let ii = next_index(i, pn);
            let different_regs =
                points[i].data & CONTOUR_REG_MASK != points[ii].data & CONTOUR_REG_MASK;
            let area_borders = points[i].data & AREA_BORDER != points[ii].data & AREA_BORDER;
            if different_regs || area_borders {
                simplified.push(ContourVertex::new(
                    points[i].x,
                    points[i].y,
                    points[i].z,
                    i as i32,
                ));
            }
        }
    }

    if simplified.is_empty() {
        // No portals: seed with the lower-left and upper-right vertices
        // under (x, z) lexicographic order.
        let mut lli = 0usize;
        let mut uri = 0usize;
        for (i, p) in points.iter().enumerate() {
            let ll = &points[lli];
            let ur = &points[uri];
            if p.x < ll.x || (p.x == ll.x && p.z < ll.z) {
                lli = i;
            }
            if p.x > ur.x || (p.x == ur.x && p.z > ur.z) {
                uri = i;
            }
        }
        simplified.push(ContourVertex::new(
            points[lli].x,
            points[lli].y,
            points[lli].z,
            lli as i32,
        ));
        simplified.push(ContourVertex::new(
            points[uri].x,
            points[uri].y,
            points[uri].z,
            uri as i32,
        ));
    }

    // Add points until every raw vertex is within the error tolerance of
    // its simplified edge.
    let mut i = 0usize;
    while i < simplified.len() {
        let ii = next_index(i, simplified.len());

        let mut ax = simplified[i].x;
        let mut az = simplified[i].z;
        let ai = simplified[i].data as usize;

        let mut bx = simplified[ii].x;
        let mut bz = simplified[ii].z;
        let bi = simplified[ii].data as usize;

        // Traverse the raw segment in lexicographic order so the result
        // does not depend on the walk's starting point.
        let ci_start;
        let cinc;
        let endi;
        if bx > ax || (bx == ax && bz > az) {
            cinc = 1;
            ci_start = (ai + cinc) % pn;
            endi = bi;
        } else {
            cinc = pn - 1;
            ci_start = (bi + cinc) % pn;
            endi = ai;
            std::mem::swap(&mut ax, &mut bx);
            std::mem::swap(&mut az, &mut bz);
        }

        let mut maxd = 0.0f32;
        let mut maxi: Option<usize> = None;

        // Tessellate only outer edges or edges between areas; portal edges
        // were seeded and stay fixed.
        if points[ci_start].data & CONTOUR_REG_MASK == 0
            || points[ci_start].data & AREA_BORDER != 0
        {
            let mut ci = ci_start;
            while ci != endi {
                let d = distance_pt_seg_sqr_2d(points[ci].x, points[ci].z, ax, az, bx, bz);
                if d > maxd {
                    maxd = d;
                    maxi = Some(ci);
                }
                ci = (ci + cinc) % pn;
            }
        }

        match maxi {
            Some(mi) if maxd > max_error * max_error => {
                simplified.insert(
                    i + 1,
                    ContourVertex::new(points[mi].x, points[mi].y, points[mi].z, mi as i32),
                );
            }
            _ => i += 1,
        }
    }

    // Split too long edges.
    if max_edge_len > 0 && (flags.tessellate_wall_edges || flags.tessellate_area_edges) {
        let mut i = 0usize;
        while i < simplified.len() {
            let ii = next_index(i, simplified.len());

            let ax = simplified[i].x;
            let az = simplified[i].z;
            let ai = simplified[i].data as usize;

            let bx = simplified[ii].x;
            let bz = simplified[ii].z;
            let bi = simplified[ii].data as usize;

            let mut maxi: Option<usize> = None;
            let ci = next_index(ai, pn);

            let tess = (flags.tessellate_wall_edges
                && points[ci].data & CONTOUR_REG_MASK == 0)
                || (flags.tessellate_area_edges && points[ci].data & AREA_BORDER != 0);

            if tess {
                let dx = bx - ax;
                let dz = bz - az;
                if dx * dx + dz * dz > max_edge_len * max_edge_len {
                    // Raw midpoint; the lexicographic direction breaks ties
                    // the same way as the refinement pass.
                    let n = if bi < ai { bi + pn - ai } else { bi - ai };
                    if n > 1 {
                        maxi = if bx > ax || (bx == ax && bz > az) {
                            Some((ai + n / 2) % pn)
                        } else {
                            Some((ai + (n + 1) / 2) % pn)
                        };
                    }
                }
            }

            match maxi {
                Some(mi) => {
                    simplified.insert(
                        i + 1,
                        ContourVertex::new(points[mi].x, points[mi].y, points[mi].z, mi as i32),
                    );
                }
                None => i += 1,
            }
        }
    }

    // Rewrite the data slots: the edge starting at a simplified vertex is
    // described by the next raw vertex, the corner classification by the
    // current one.
    for v in simplified.iter_mut() {
        let ai = next_index(v.data as usize, pn);
        let bi = v.data as usize;
        v.data = (points[ai].data & (CONTOUR_REG_MASK | AREA_BORDER))
            | (points[bi].data & BORDER_VERTEX);
    }
}

/// Removes vertices whose following neighbor coincides with them on the XZ
/// plane. The scan does not advance past a removal, so removal cascades are
/// handled in one pass; a residual coincidence across the removed index is
/// tolerated downstream.
fn remove_degenerate_segments(simplified: &mut Vec<ContourVertex>) {
    let mut i = 0;
    while i < simplified.len() {
        let ni = next_index(i, simplified.len());
        if simplified[i].x == simplified[ni].x && simplified[i].z == simplified[ni].z {
            simplified.remove(i);
        } else {
            i += 1;
        }
    }
}

/// Signed area of a contour on the XZ plane, rounded with a positive bias.
///
/// Positive for outer contours, negative for holes. The `(2A + 1) / 2`
/// rounding truncates toward zero for negative totals; downstream relies on
/// the exact values, so the bias stays.
pub fn calc_area_of_polygon_2d(verts: &[ContourVertex]) -> i32 {
    if verts.is_empty() {
        return 0;
    }
    let mut area = 0i32;
    let mut j = verts.len() - 1;
    for i in 0..verts.len() {
        area += verts[i].x * verts[j].z - verts[j].x * verts[i].z;
        j = i;
    }
    (area + 1) / 2
}

/// Finds the closest mutually facing vertex pair between an outer contour
/// and a hole, for splicing.
///
/// A hole vertex only qualifies for an outer vertex when it lies in the
/// forward cone spanned by the outer vertex's neighbors; without that
/// restriction the splice could cross the outer boundary.
fn find_closest_vertices(
    outer: &[ContourVertex],
    hole: &[ContourVertex],
) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    let mut best_dist = i32::MAX;
    for i in 0..outer.len() {
        let va = &outer[i];
        let van = &outer[next_index(i, outer.len())];
        let vap = &outer[prev_index(i, outer.len())];
        for (j, vb) in hole.iter().enumerate() {
            if left_on_2d(vap.x, vap.z, va.x, va.z, vb.x, vb.z)
                && left_on_2d(va.x, va.z, van.x, van.z, vb.x, vb.z)
            {
                let dx = vb.x - va.x;
                let dz = vb.z - va.z;
                let d = dx * dx + dz * dz;
                if d < best_dist {
                    best_dist = d;
                    best = Some((i, j));
                }
            }
        }
    }
    best
}

/// Splices a hole ring into an outer ring at the pivot pair `(ia, ib)`.
///
/// Both rings are rotated to their pivot and the pivot vertices are doubled,
/// so the result has `outer.len() + hole.len() + 2` vertices.
fn merge_contours(
    outer: &[ContourVertex],
    hole: &[ContourVertex],
    ia: usize,
    ib: usize,
) -> Vec<ContourVertex> {
    let na = outer.len();
    let nb = hole.len();
    let mut merged = Vec::with_capacity(na + nb + 2);
    for k in 0..=na {
        merged.push(outer[(ia + k) % na]);
    }
    for k in 0..=nb {
        merged.push(hole[(ib + k) % nb]);
    }
    merged
}

/// Merges every hole contour into the first positive-area contour of the
/// same region. Unmergeable holes are left as they are; merged holes stay
/// in the list with their vertices moved into the grown outer ring.
fn merge_region_holes(contours: &mut [Contour]) {
    for i in 0..contours.len() {
        if calc_area_of_polygon_2d(&contours[i].vertices) >= 0 {
            continue;
        }
        let region = contours[i].region;

        let merge_idx = (0..contours.len()).find(|&j| {
            j != i
                && !contours[j].vertices.is_empty()
                && contours[j].region == region
                && calc_area_of_polygon_2d(&contours[j].vertices) > 0
        });
        let Some(j) = merge_idx else {
            log::warn!(
                "contour build: hole in region {} has no outer contour, left unmerged",
                region
            );
            continue;
        };

        let Some((ia, ib)) = find_closest_vertices(&contours[j].vertices, &contours[i].vertices)
        else {
            log::warn!(
                "contour build: no facing vertex pair for hole in region {}, merge skipped",
                region
            );
            continue;
        };

        let hole = std::mem::take(&mut contours[i].vertices);
        let merged = merge_contours(&contours[j].vertices, &hole, ia, ib);
        contours[j].vertices = merged;
    }
}
