use std::time::Duration;

use draft_wheel_core::{Roll, SegmentColor};
use draft_wheel_rendering::{
    resolve_by_sampling, resolve_geometric, PointerProbe, RasterOptions, ResolutionMethod,
    SegmentLabel, WheelLayout, WheelPresentation, WheelRaster,
};
use draft_wheel_system_spin::{Config, Spinner};
use draft_wheel_world::{query, DrawState, Roster, RosterEntry};

const LEAGUE: [(&str, f64, &str); 12] = [
    ("Alex", 10.0, "#e6194b"),
    ("Jamie", 8.0, "#3cb44b"),
    ("Taylor", 7.0, "#ffe119"),
    ("Morgan", 6.0, "#4363d8"),
    ("Casey", 5.0, "#f58231"),
    ("Riley", 4.0, "#911eb4"),
    ("Jordan", 3.0, "#46f0f0"),
    ("Peyton", 3.0, "#f032e6"),
    ("Quinn", 2.0, "#bcf60c"),
    ("Avery", 2.0, "#fabebe"),
    ("Skyler", 1.0, "#008080"),
    ("Dakota", 1.0, "#e6beff"),
];

fn league() -> DrawState {
    let entries = LEAGUE
        .iter()
        .map(|(name, weight, hex)| {
            RosterEntry::raw(
                *name,
                *weight,
                SegmentColor::parse_hex(hex).expect("valid color"),
            )
        })
        .collect();
    DrawState::new(Roster::new(entries).expect("valid roster"))
}

#[test]
fn pixel_sampling_agrees_with_the_engine_for_every_draw() {
    let presentation = WheelPresentation::with_radius(160.0).expect("valid presentation");
    let probe = PointerProbe::for_presentation(&presentation);
    let mut spinner = Spinner::new(Config::with_seed(17).with_duration(Duration::from_secs(1)));
    let mut state = league();
    let mut rotation = 0.0;
    let mut fraction = 0.61_f64;

    while !query::is_complete(&state) {
        let contestants = query::active_contestants(&state);
        let total = query::total_weight(&state);
        let selection = state
            .draw(Roll::new(total * fraction))
            .expect("draw succeeds");

        let plan = spinner.plan(rotation, selection.target_angle);
        rotation = plan.angle_at(plan.duration());

        let layout = WheelLayout::new(&presentation, &contestants, rotation);
        let geometric = resolve_geometric(&layout.spans(), rotation, presentation.pointer_angle());
        assert_eq!(geometric, Some(selection.index), "geometry disagrees with engine");

        let raster = WheelRaster::render(&presentation, &layout, rotation, RasterOptions::default());
        let resolved = resolve_by_sampling(&raster, &layout, &presentation, rotation, probe)
            .expect("non-empty wheel resolves");
        assert_eq!(resolved.index, selection.index, "pixels disagree with engine");
        assert_eq!(resolved.method, ResolutionMethod::Sampled);

        let _ = state.acknowledge().expect("acknowledge succeeds");
        fraction = (fraction * 3.7 + 0.13) % 1.0;
    }
}

#[test]
fn probe_outside_the_rim_scans_inwards() {
    let presentation = WheelPresentation::with_radius(100.0).expect("valid presentation");
    let state = league();
    let contestants = query::active_contestants(&state);
    let rotation = 33.0;
    let layout = WheelLayout::new(&presentation, &contestants, rotation);
    let raster = WheelRaster::render(&presentation, &layout, rotation, RasterOptions::default());
    let probe = PointerProbe::new(104.0, 16).expect("valid probe");

    let resolved = resolve_by_sampling(&raster, &layout, &presentation, rotation, probe)
        .expect("non-empty wheel resolves");

    assert!(matches!(
        resolved.method,
        ResolutionMethod::Scanned { steps } if steps >= 4
    ));
    assert_eq!(
        Some(resolved.index),
        resolve_geometric(&layout.spans(), rotation, presentation.pointer_angle())
    );
}

#[test]
fn short_scan_falls_back_to_geometry() {
    let presentation = WheelPresentation::with_radius(100.0).expect("valid presentation");
    let state = league();
    let contestants = query::active_contestants(&state);
    let layout = WheelLayout::new(&presentation, &contestants, 0.0);
    let raster = WheelRaster::render(&presentation, &layout, 0.0, RasterOptions::default());
    let probe = PointerProbe::new(130.0, 8).expect("valid probe");

    let resolved = resolve_by_sampling(&raster, &layout, &presentation, 0.0, probe)
        .expect("non-empty wheel resolves");

    assert_eq!(resolved.method, ResolutionMethod::Geometric);
    assert_eq!(
        Some(resolved.index),
        resolve_geometric(&layout.spans(), 0.0, presentation.pointer_angle())
    );
}

#[test]
fn shared_colors_always_resolve_geometrically() {
    let presentation = WheelPresentation::with_radius(80.0).expect("valid presentation");
    let shared = SegmentColor::from_rgb(0x2f, 0x95, 0x32);
    let state = DrawState::new(
        Roster::new(vec![
            RosterEntry::raw("North", 1.0, shared),
            RosterEntry::raw("South", 1.0, shared),
        ])
        .expect("valid roster"),
    );
    let contestants = query::active_contestants(&state);

    for rotation in [0.0, 45.0, 135.0, 200.0] {
        let layout = WheelLayout::new(&presentation, &contestants, rotation);
        assert!(layout.is_ambiguous(shared));
        let raster =
            WheelRaster::render(&presentation, &layout, rotation, RasterOptions::default());
        let resolved = resolve_by_sampling(
            &raster,
            &layout,
            &presentation,
            rotation,
            PointerProbe::for_presentation(&presentation),
        )
        .expect("non-empty wheel resolves");

        assert_eq!(resolved.method, ResolutionMethod::Geometric);
        assert_eq!(
            Some(resolved.index),
            resolve_geometric(&layout.spans(), rotation, presentation.pointer_angle())
        );
    }
}

#[test]
fn narrow_segments_never_drop_names() {
    let presentation = WheelPresentation::with_radius(120.0).expect("valid presentation");
    let mut state = league();

    while !query::is_complete(&state) {
        let contestants = query::active_contestants(&state);
        let layout = WheelLayout::new(&presentation, &contestants, 12.5);

        for segment in &layout.segments {
            let listed = layout.overflow_names.contains(&segment.name);
            match segment.label {
                SegmentLabel::Text { .. } => assert!(!listed, "{} listed twice", segment.name),
                SegmentLabel::Marker { .. } => assert!(listed, "{} dropped", segment.name),
            }
            if segment.span.sweep() <= presentation.min_label_span_degrees() {
                assert!(matches!(segment.label, SegmentLabel::Marker { .. }));
            }
        }
        assert_eq!(layout.segments.len(), contestants.len());

        let total = query::total_weight(&state);
        let _ = state.draw(Roll::new(total * 0.5)).expect("draw succeeds");
        let _ = state.acknowledge().expect("acknowledge succeeds");
    }
}
