use polytess::{
    BoundingBox, Cell, Cell3D, Generator, Plc, SerialTessellator2d, SerialTessellator3d, TessellationError, Tessellator,
    box_side, plc_facet_index,
};

#[test]
fn test_cell_metrics() {
    // Create a 10x20x30 box
    let bounds = BoundingBox::new([0.0, 0.0, 0.0], [10.0, 20.0, 30.0]);
    let cell = Cell3D::new(0, bounds);

    let vol = cell.measure();
    assert!((vol - 6000.0).abs() < 1e-6, "Expected volume 6000, got {}", vol);

    let c = cell.centroid();
    assert!((c[0] - 5.0).abs() < 1e-6, "Centroid X mismatch");
    assert!((c[1] - 10.0).abs() < 1e-6, "Centroid Y mismatch");
    assert!((c[2] - 15.0).abs() < 1e-6, "Centroid Z mismatch");
}

#[test]
fn test_tessellation_workflow() {
    let bounds = BoundingBox::new([0.0; 3], [100.0; 3]);
    let generators = vec![Generator::new(0, [10.0, 10.0, 10.0]), Generator::new(1, [90.0, 90.0, 90.0])];

    let cells = SerialTessellator3d::default().tessellate_in_box(&generators, &bounds).unwrap();
    assert_eq!(cells.len(), 2);
    assert_eq!(cells[0].id(), 0);
    assert_eq!(cells[1].id(), 1);

    let total_vol: f64 = cells.iter().map(|c| c.measure()).sum();
    assert!((total_vol - 1_000_000.0).abs() < 1e-3, "Total volume should be 1,000,000, got {}", total_vol);
}

#[test]
fn test_tessellation_cells_octet() {
    let bounds = BoundingBox::new([0.0; 3], [100.0; 3]);
    let generators = Generator::lattice(&bounds, [2, 2, 2]);
    let cells = SerialTessellator3d::default().tessellate_in_box(&generators, &bounds).unwrap();

    assert_eq!(cells.len(), 8);
    for cell in &cells {
        assert!((cell.measure() - 125_000.0).abs() < 1e-3, "Cell {} has volume {}", cell.id(), cell.measure());
        let generator_neighbors = cell.neighbors().iter().filter(|&&n| n >= 0).count();
        assert_eq!(generator_neighbors, 3, "Cell {} neighbors {:?}", cell.id(), cell.neighbors());
    }
}

#[test]
fn test_unit_square_with_four_generators() {
    let generators = vec![
        Generator::new(10, [0.25, 0.25]),
        Generator::new(11, [0.75, 0.25]),
        Generator::new(12, [0.25, 0.75]),
        Generator::new(13, [0.75, 0.75]),
    ];
    let cells = SerialTessellator2d::default().tessellate_in_box(&generators, &BoundingBox::unit()).unwrap();

    let first = &cells[0];
    assert!((first.measure() - 0.25).abs() < 1e-12);
    let mut neighbors = first.neighbors();
    neighbors.sort();
    assert_eq!(neighbors, vec![box_side(1, false), box_side(0, false), 11, 12]);
}

#[test]
fn test_default_region_is_padded() {
    // Generator bounds [0, 1] x [0, 0] are padded by a quarter of the largest extent.
    let generators = vec![Generator::new(0, [0.0, 0.0]), Generator::new(1, [1.0, 0.0])];
    let cells = SerialTessellator2d::default().tessellate(&generators).unwrap();
    let total: f64 = cells.iter().map(|c| c.measure()).sum();
    assert!((total - 1.5 * 0.5).abs() < 1e-12, "Total area {}", total);
}

#[test]
fn test_triangle_plc() {
    let plc = Plc::polygon(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
    let generators = vec![Generator::new(0, [0.2, 0.2]), Generator::new(1, [0.6, 0.2]), Generator::new(2, [0.2, 0.6])];
    let cells = SerialTessellator2d::default().tessellate_with_plc(&generators, &plc).unwrap();

    let total: f64 = cells.iter().map(|c| c.measure()).sum();
    assert!((total - 0.5).abs() < 1e-9, "Total area {}", total);

    // The hypotenuse is facet 1 and bounds the cells of generators 1 and 2.
    for cell in &cells[1..] {
        assert!(cell.neighbors().iter().any(|&n| plc_facet_index(n) == Some(1)), "{:?}", cell.neighbors());
    }
    assert!(cells[0].neighbors().iter().all(|&n| plc_facet_index(n) != Some(1)));
}

#[test]
fn test_cuboid_plc_matches_box() {
    let bounds = BoundingBox::new([0.0, 0.0, 0.0], [2.0, 1.0, 1.0]);
    let generators = Generator::random(&bounds, 40, 3);
    let serial = SerialTessellator3d::default();

    let boxed = serial.tessellate_in_box(&generators, &bounds).unwrap();
    let walled = serial.tessellate_with_plc(&generators, &Plc::cuboid(&bounds)).unwrap();
    for (a, b) in boxed.iter().zip(&walled) {
        assert_eq!(a.id(), b.id());
        assert!((a.measure() - b.measure()).abs() < 1e-9, "Cell {}: {} vs {}", a.id(), a.measure(), b.measure());
    }
}

#[test]
fn test_generator_outside_box() {
    let generators = vec![Generator::new(0, [0.5, 0.5]), Generator::new(9, [1.5, 0.5])];
    let err = SerialTessellator2d::default().tessellate_in_box(&generators, &BoundingBox::unit()).unwrap_err();
    assert_eq!(err, TessellationError::GeneratorOutsideRegion { id: 9 });
}

#[test]
fn test_notched_plc_cells_fill_it() {
    let plc = Plc::polygon(vec![[0.0, 0.0], [1.0, 0.0], [0.5, 0.2], [1.0, 1.0], [0.0, 1.0]]);
    let generators = vec![
        Generator::new(0, [0.2, 0.5]),
        Generator::new(1, [0.8, 0.8]),
        Generator::new(2, [0.3, 0.1]),
        Generator::new(3, [0.7, 0.05]),
    ];
    let cells = SerialTessellator2d::default().tessellate_with_plc(&generators, &plc).unwrap();
    assert_eq!(cells.len(), 4);
    let total: f64 = cells.iter().map(|c| c.measure()).sum();
    assert!((total - 0.75).abs() < 1e-12, "total area {total}");

    // The notch edges bound the cells in full.
    let notch: f64 = cells
        .iter()
        .flat_map(|c| c.facets())
        .filter(|f| matches!(plc_facet_index(f.neighbor), Some(1 | 2)))
        .map(|f| f.measure)
        .sum();
    let expected = (0.5f64.powi(2) + 0.2f64.powi(2)).sqrt() + (0.5f64.powi(2) + 0.8f64.powi(2)).sqrt();
    assert!((notch - expected).abs() < 1e-12);

    let in_notch = [Generator::new(0, [0.2, 0.5]), Generator::new(1, [0.9, 0.4])];
    assert_eq!(
        SerialTessellator2d::default().tessellate_with_plc(&in_notch, &plc).unwrap_err(),
        TessellationError::GeneratorOutsideRegion { id: 1 }
    );
}

#[test]
fn test_hollow_plc_is_rejected_in_3d() {
    let outer = Plc::cuboid(&BoundingBox::new([0.0; 3], [3.0; 3]));
    let inner = Plc::cuboid(&BoundingBox::new([1.0; 3], [2.0; 3]));
    let mut points = outer.points.clone();
    points.extend(&inner.points);
    let hole = inner.facets.iter().map(|f| f.iter().map(|i| i + 8).collect()).collect();
    let plc = Plc::new(points, outer.facets.clone()).with_holes(vec![hole]);

    let err = SerialTessellator3d::default().tessellate_with_plc(&[Generator::new(0, [0.5; 3])], &plc).unwrap_err();
    assert!(matches!(err, TessellationError::InvalidPlc(_)), "{err}");
}

#[test]
fn test_lattice_cells_are_quadrilaterals() {
    let bounds = BoundingBox::new([0.0, 0.0], [5.0, 3.0]);
    let cells = SerialTessellator2d::default().tessellate_in_box(&Generator::lattice(&bounds, [5, 3]), &bounds).unwrap();
    assert_eq!(cells.len(), 15);
    for cell in &cells {
        assert_eq!(cell.vertices().len(), 4, "Cell {} has vertices {:?}", cell.id(), cell.vertices());
        assert!((cell.measure() - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_plc_requests_fail_without_support() {
    let boxed = polytess::BoxTessellator2d::default();
    assert!(!boxed.handles_plcs());
    let plc = Plc::rectangle(&BoundingBox::unit());
    for generators in [vec![], vec![Generator::new(0, [0.5, 0.5])], vec![Generator::new(0, [9.0, 9.0])]] {
        assert!(matches!(boxed.tessellate_with_plc(&generators, &plc), Err(TessellationError::UnsupportedPlc { .. })));
    }
}
