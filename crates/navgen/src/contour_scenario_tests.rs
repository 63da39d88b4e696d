//! End-to-end scenarios for the contour build
//!
//! These tests assemble small compact heightfields through the public
//! surface and check the invariants of the produced contour sets: closed
//! rings with at least three vertices, no coincident consecutive vertices,
//! portal bits preserved, holes fused into their enclosing contour.

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::{
        calc_area_of_polygon_2d, CompactHeightfield, Contour, ContourBuildFlags, ContourConfig,
        ContourSet, SpanData,
    };

    /// Single-level heightfield with one span per listed `(x, z, region, area)` cell.
    fn build_grid(
        width: i32,
        height: i32,
        border_size: i32,
        cells: &[(i32, i32, u16, u8)],
    ) -> CompactHeightfield {
        let input: Vec<SpanData> = cells
            .iter()
            .map(|&(x, z, region, area)| SpanData::new(x, z, 0, region, area))
            .collect();
        CompactHeightfield::from_spans(
            width,
            height,
            Vec3::ZERO,
            Vec3::new(width as f32, 1.0, height as f32),
            1.0,
            0.2,
            border_size,
            &input,
        )
        .unwrap()
    }

    fn build_contours(chf: &CompactHeightfield, max_error: f32, max_edge_len: i32) -> ContourSet {
        build_contours_with_flags(chf, max_error, max_edge_len, ContourBuildFlags::default())
    }

    fn build_contours_with_flags(
        chf: &CompactHeightfield,
        max_error: f32,
        max_edge_len: i32,
        flags: ContourBuildFlags,
    ) -> ContourSet {
        ContourSet::build(
            chf,
            &ContourConfig {
                max_error,
                max_edge_len,
                flags,
            },
        )
        .unwrap()
    }

    fn xz(contour: &Contour) -> Vec<(i32, i32)> {
        contour.vertices.iter().map(|v| (v.x, v.z)).collect()
    }

    fn assert_no_coincident_neighbors(contour: &Contour) {
        let n = contour.vertices.len();
        for i in 0..n {
            let a = &contour.vertices[i];
            let b = &contour.vertices[(i + 1) % n];
            assert!(
                a.x != b.x || a.z != b.z,
                "consecutive vertices coincide at ({}, {})",
                a.x,
                a.z
            );
        }
    }

    /// A filled 4x4 block of one region reduces to its four corners.
    #[test]
    fn test_single_square_region() {
        let cells: Vec<(i32, i32, u16, u8)> = (0..4)
            .flat_map(|z| (0..4).map(move |x| (x, z, 1, 1)))
            .collect();
        let chf = build_grid(4, 4, 0, &cells);
        let cset = build_contours(&chf, 1.0, 0);

        assert_eq!(cset.contours.len(), 1);
        let contour = &cset.contours[0];
        assert_eq!(contour.region, 1);
        assert_eq!(contour.area, 1);
        assert_eq!(contour.nverts(), 4);
        assert_eq!(contour.nraw_verts(), 16);

        let positions = xz(contour);
        for corner in [(0, 0), (4, 0), (4, 4), (0, 4)] {
            assert!(positions.contains(&corner), "missing corner {:?}", corner);
        }
        assert!(calc_area_of_polygon_2d(&contour.vertices) > 0);
        // A pure outer ring has no portal or flag bits anywhere.
        assert!(contour.vertices.iter().all(|v| v.data == 0));
        assert_no_coincident_neighbors(contour);
    }

    /// Two regions sharing a straight edge keep their portal vertices on it.
    #[test]
    fn test_two_adjacent_regions_share_portal() {
        let cells: Vec<(i32, i32, u16, u8)> = (0..4)
            .flat_map(|z| (0..4).map(move |x| (x, z, if x < 2 { 1 } else { 2 }, 1)))
            .collect();
        let chf = build_grid(4, 4, 0, &cells);
        let cset = build_contours(&chf, 1.0, 0);

        assert_eq!(cset.contours.len(), 2);
        for contour in &cset.contours {
            assert_eq!(contour.nverts(), 4);
            assert_no_coincident_neighbors(contour);
            assert!(calc_area_of_polygon_2d(&contour.vertices) > 0);

            // Both portal endpoints sit on the shared edge x = 2.
            let positions = xz(contour);
            assert!(positions.contains(&(2, 0)));
            assert!(positions.contains(&(2, 4)));

            // The vertex opening the portal run references the other region.
            let other = if contour.region == 1 { 2 } else { 1 };
            let portal: Vec<_> = contour
                .vertices
                .iter()
                .filter(|v| v.region() == other)
                .collect();
            assert_eq!(portal.len(), 1);
            assert_eq!(portal[0].x, 2);
        }
    }

    /// An annulus produces an outer ring and a hole which merge into one
    /// contour of `|outer| + |hole| + 2` vertices with positive area.
    #[test]
    fn test_annulus_merges_hole() {
        let cells: Vec<(i32, i32, u16, u8)> = (0..6)
            .flat_map(|z| (0..6).map(move |x| (x, z, 1, 1)))
            .filter(|&(x, z, _, _)| !((2..4).contains(&x) && (2..4).contains(&z)))
            .collect();
        let chf = build_grid(6, 6, 0, &cells);
        let cset = build_contours(&chf, 0.5, 0);

        assert_eq!(cset.contours.len(), 2);
        let nonempty: Vec<&Contour> = cset
            .contours
            .iter()
            .filter(|c| !c.vertices.is_empty())
            .collect();
        assert_eq!(nonempty.len(), 1);

        let merged = nonempty[0];
        assert_eq!(merged.region, 1);
        // Outer square and hole square simplify to 4 corners each; the
        // splice doubles both pivots.
        assert_eq!(merged.nverts(), 4 + 4 + 2);
        assert!(calc_area_of_polygon_2d(&merged.vertices) > 0);
        assert_no_coincident_neighbors(merged);

        // The hole corners are part of the merged ring.
        let positions = xz(merged);
        for corner in [(2, 2), (4, 2), (4, 4), (2, 4)] {
            assert!(positions.contains(&corner), "missing hole corner {:?}", corner);
        }
    }

    /// An L-shaped region keeps its step corner at a tight tolerance and
    /// collapses to its two lex-extreme seeds (and is dropped) at a loose one.
    #[test]
    fn test_l_shape_step_corner() {
        let cells: Vec<(i32, i32, u16, u8)> = (0..4)
            .flat_map(|z| (0..4).map(move |x| (x, z, 1, 1)))
            .filter(|&(x, z, _, _)| x < 2 || z < 2)
            .collect();
        let chf = build_grid(4, 4, 0, &cells);

        let cset = build_contours(&chf, 0.5, 0);
        assert_eq!(cset.contours.len(), 1);
        let contour = &cset.contours[0];
        assert_eq!(contour.nverts(), 6);
        let positions = xz(contour);
        for corner in [(0, 0), (4, 0), (4, 2), (2, 2), (2, 4), (0, 4)] {
            assert!(positions.contains(&corner), "missing corner {:?}", corner);
        }

        // Without portals a loose tolerance leaves only the two seeds, and
        // a two-vertex ring is discarded.
        let cset = build_contours(&chf, 10.0, 0);
        assert!(cset.contours.is_empty());
    }

    /// Long wall edges are split at raw midpoints until they fit the limit,
    /// but only when wall tessellation is enabled.
    #[test]
    fn test_long_edge_tessellation() {
        let cells: Vec<(i32, i32, u16, u8)> = (0..6).map(|x| (x, 0, 1, 1)).collect();
        let chf = build_grid(6, 1, 0, &cells);

        let cset = build_contours(&chf, 0.5, 2);
        assert_eq!(cset.contours.len(), 1);
        let contour = &cset.contours[0];
        assert!(contour.nverts() > 4);
        let n = contour.nverts();
        for i in 0..n {
            let a = &contour.vertices[i];
            let b = &contour.vertices[(i + 1) % n];
            let dx = b.x - a.x;
            let dz = b.z - a.z;
            assert!(
                dx * dx + dz * dz <= 4,
                "edge ({}, {}) -> ({}, {}) exceeds max length",
                a.x,
                a.z,
                b.x,
                b.z
            );
        }

        // With both tessellation flags off the limit is ignored.
        let flags = ContourBuildFlags {
            tessellate_wall_edges: false,
            tessellate_area_edges: false,
        };
        let cset = build_contours_with_flags(&chf, 0.5, 2, flags);
        assert_eq!(cset.contours[0].nverts(), 4);
    }

    /// Area-border portal edges split under `tessellate_area_edges` while
    /// plain walls stay untouched.
    #[test]
    fn test_area_border_edges_tessellate() {
        let mut cells = Vec::new();
        for x in 0..6 {
            cells.push((x, 0, 1, 1));
            cells.push((x, 1, 2, 2));
        }
        let chf = build_grid(6, 2, 0, &cells);
        let flags = ContourBuildFlags {
            tessellate_wall_edges: false,
            tessellate_area_edges: true,
        };
        let cset = build_contours_with_flags(&chf, 0.5, 2, flags);

        assert_eq!(cset.contours.len(), 2);
        let region1 = cset.contours.iter().find(|c| c.region == 1).unwrap();

        // The shared edge is an area border and gets subdivided.
        assert_eq!(region1.nverts(), 7);
        let portal: Vec<_> = region1
            .vertices
            .iter()
            .filter(|v| v.is_area_border())
            .collect();
        assert!(!portal.is_empty());
        assert!(portal.iter().all(|v| v.region() == 2 && v.z == 1));

        // The opposite wall is not tessellated and keeps its full length.
        let n = region1.nverts();
        let max_sq_len = (0..n)
            .map(|i| {
                let a = &region1.vertices[i];
                let b = &region1.vertices[(i + 1) % n];
                (b.x - a.x).pow(2) + (b.z - a.z).pow(2)
            })
            .max()
            .unwrap();
        assert_eq!(max_sq_len, 36);
    }

    /// A fully isolated single-span region has all four edges on the
    /// boundary (`flags == 0xf`) and is skipped by the driver.
    #[test]
    fn test_isolated_single_span_region_is_skipped() {
        let chf = build_grid(3, 3, 0, &[(1, 1, 1, 1)]);
        let cset = build_contours(&chf, 0.5, 0);
        assert!(cset.contours.is_empty());
    }

    /// At a huge error tolerance the simplified ring is exactly the portal
    /// seed set; rings with fewer than three seeds are dropped.
    #[test]
    fn test_huge_error_keeps_portal_seed_set() {
        let cells: Vec<(i32, i32, u16, u8)> = (0..4)
            .flat_map(|z| (0..6).map(move |x| (x, z, 1 + (x / 2) as u16, 1)))
            .collect();
        let chf = build_grid(6, 4, 0, &cells);
        let cset = build_contours(&chf, 100.0, 0);

        // The outer strips have only two portal seeds each and vanish; the
        // middle strip keeps one seed per portal transition.
        assert_eq!(cset.contours.len(), 1);
        let contour = &cset.contours[0];
        assert_eq!(contour.region, 2);
        assert_eq!(contour.nverts(), 4);

        let positions = xz(contour);
        for corner in [(2, 0), (2, 4), (4, 0), (4, 4)] {
            assert!(positions.contains(&corner), "missing seed {:?}", corner);
        }
        let mut regions: Vec<u16> = contour.vertices.iter().map(|v| v.region()).collect();
        regions.sort_unstable();
        assert_eq!(regions, vec![0, 0, 1, 3]);
    }

    /// The border offset is subtracted from every vertex and the set bounds.
    #[test]
    fn test_border_size_offsets_output() {
        let cells: Vec<(i32, i32, u16, u8)> = (1..5)
            .flat_map(|z| (1..5).map(move |x| (x, z, 1, 1)))
            .collect();
        let chf = build_grid(6, 6, 1, &cells);
        let cset = build_contours(&chf, 1.0, 0);

        assert_eq!(cset.width, 4);
        assert_eq!(cset.height, 4);
        assert_eq!(cset.border_size, 1);
        assert_eq!(cset.bmin, Vec3::new(1.0, 0.0, 1.0));
        assert_eq!(cset.bmax, Vec3::new(5.0, 1.0, 5.0));

        assert_eq!(cset.contours.len(), 1);
        let positions = xz(&cset.contours[0]);
        for corner in [(0, 0), (4, 0), (4, 4), (0, 4)] {
            assert!(positions.contains(&corner), "missing corner {:?}", corner);
        }
        for v in &cset.contours[0].raw_vertices {
            assert!((0..=4).contains(&v.x));
            assert!((0..=4).contains(&v.z));
        }
    }

    /// Building twice from the same input yields identical contour sets.
    #[test]
    fn test_build_is_deterministic() {
        let cells: Vec<(i32, i32, u16, u8)> = (0..6)
            .flat_map(|z| (0..6).map(move |x| (x, z, 1, 1)))
            .filter(|&(x, z, _, _)| !((2..4).contains(&x) && (2..4).contains(&z)))
            .collect();
        let chf = build_grid(6, 6, 0, &cells);

        let first = build_contours(&chf, 0.5, 2);
        let second = build_contours(&chf, 0.5, 2);
        assert_eq!(first, second);
    }

    /// A heightfield without any regions produces an empty contour set.
    #[test]
    fn test_empty_input() {
        let chf = build_grid(4, 4, 0, &[]);
        let cset = build_contours(&chf, 1.0, 0);
        assert!(cset.contours.is_empty());
        assert_eq!(cset.width, 4);
        assert_eq!(cset.height, 4);
    }
}
