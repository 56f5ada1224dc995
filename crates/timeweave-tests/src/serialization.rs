//! Integration tests for JSON interchange.
//!
//! Documents are written and read back through the public API only.

use serde_json::{json, Value};
use timeweave_core::{Rational64, RationalTime, TimeRange};
use timeweave_timeline::{
    from_json_str, to_json_string, Clip, Composable, Effect, EffectKind, EncodeOptions, Gap,
    Marker, MarkerColor, MediaReference, SchemaObject, SchemaRegistry, SerializableCollection,
    Timeline, TimelineError, Track, TrackKind, Transition,
};

use crate::init_tracing;

// ── Helpers ────────────────────────────────────────────────────

fn range(start: i64, dur: i64) -> Value {
    json!({
        "OTIO_SCHEMA": "TimeRange.1",
        "start_time": {"OTIO_SCHEMA": "RationalTime.1", "rate": 24.0, "value": start as f64},
        "duration": {"OTIO_SCHEMA": "RationalTime.1", "rate": 24.0, "value": dur as f64},
    })
}

fn build_timeline() -> Timeline {
    let mut timeline = Timeline::new("Round Trip");
    timeline.global_start_time = Some(RationalTime::new(86400, 24));
    timeline.metadata.insert("project".to_string(), json!({"id": 7}));

    let v1 = timeline.append_track(Track::new_video("V1")).unwrap();
    let a1 = timeline.append_track(Track::new_audio("A1")).unwrap();
    let arena = timeline.arena_mut();

    let mut a = Clip::new("A")
        .with_source_range(TimeRange::from_frames(10, 24, 24))
        .with_media_reference(MediaReference::external(
            "file:///media/a.mov",
            Some(TimeRange::from_frames(0, 100, 24)),
        ));
    a.item
        .markers
        .push(Marker::new("note", TimeRange::from_frames(12, 1, 24)).with_color(MarkerColor::Green));
    a.item
        .effects
        .push(Effect::linear_time_warp("speed", Rational64::new(2, 1)));
    let a = arena.add(a);
    let dissolve = arena.add(Transition::new(
        "dissolve",
        RationalTime::new(2, 24),
        RationalTime::new(2, 24),
    ));
    let b = arena.add(Clip::new("B").with_source_range(TimeRange::from_frames(0, 24, 24)));
    arena.set_children(v1, vec![a, dissolve, b]).unwrap();

    let silence = arena.add(Gap::with_duration(RationalTime::new(48, 24)));
    arena.append_child(a1, silence).unwrap();
    timeline
}

// ── Round trips ────────────────────────────────────────────────

#[test]
fn timeline_round_trip() {
    init_tracing();
    let timeline = build_timeline();
    let text = timeline.to_json_string(EncodeOptions::pretty()).unwrap();
    let decoded = Timeline::from_json_str(&text, &SchemaRegistry::default()).unwrap();

    assert_eq!(decoded.name, "Round Trip");
    assert_eq!(decoded.metadata["project"]["id"], 7);
    assert_eq!(decoded.global_start_time, Some(RationalTime::new(86400, 24)));
    assert_eq!(decoded.duration().unwrap(), timeline.duration().unwrap());
    assert_eq!(decoded.audio_tracks().unwrap().len(), 1);

    let clips = decoded
        .each_clip(None)
        .unwrap()
        .collect::<timeweave_timeline::Result<Vec<_>>>()
        .unwrap();
    let arena = decoded.arena();
    let Composable::Clip(a) = arena.get(clips[0]).unwrap() else {
        panic!("expected a clip");
    };
    assert_eq!(a.item.markers[0].color, MarkerColor::Green);
    assert_eq!(a.item.markers[0].marked_range, TimeRange::from_frames(12, 1, 24));
    assert_eq!(
        a.item.effects[0].kind,
        EffectKind::LinearTimeWarp { time_scalar: Rational64::new(2, 1) }
    );
    assert_eq!(
        a.media_reference.available_range,
        Some(TimeRange::from_frames(0, 100, 24))
    );

    // Writing the decoded timeline gives the same document.
    assert_eq!(decoded.to_json_string(EncodeOptions::pretty()).unwrap(), text);
}

#[test]
fn track_kind_survives() {
    let timeline = build_timeline();
    let text = timeline.to_json_string(EncodeOptions::default()).unwrap();
    let decoded = Timeline::from_json_str(&text, &SchemaRegistry::default()).unwrap();
    let arena = decoded.arena();
    let kinds: Vec<TrackKind> = arena
        .children(decoded.tracks())
        .unwrap()
        .iter()
        .map(|id| arena.get(*id).unwrap().as_track().unwrap().kind.clone())
        .collect();
    assert_eq!(kinds, [TrackKind::Video, TrackKind::Audio]);
}

#[test]
fn unknown_objects_are_written_back_verbatim() {
    let document = json!({
        "OTIO_SCHEMA": "SerializableCollection.1",
        "metadata": {},
        "name": "bin",
        "children": [
            {"OTIO_SCHEMA": "Storyboard.3", "panels": [1, 2, 3], "author": "k"},
            {
                "OTIO_SCHEMA": "Clip.1",
                "metadata": {},
                "name": "shot",
                "source_range": range(0, 12),
            },
        ],
    });
    let registry = SchemaRegistry::default();
    let object = from_json_str(&document.to_string(), &registry).unwrap();
    let SchemaObject::Collection(collection) = &object else {
        panic!("expected a collection");
    };
    assert_eq!(collection.children[0].schema_name(), "Storyboard");
    assert_eq!(collection.each_clip(None).unwrap().len(), 1);

    let written: Value =
        serde_json::from_str(&to_json_string(&object, EncodeOptions::default()).unwrap()).unwrap();
    assert_eq!(
        written["children"][0].to_string(),
        r#"{"OTIO_SCHEMA":"Storyboard.3","panels":[1,2,3],"author":"k"}"#
    );
}

#[test]
fn collection_round_trip() {
    let mut collection = SerializableCollection::new("dailies");
    collection.push(build_timeline());
    collection.push(Marker::new("loose", TimeRange::from_frames(0, 1, 24)));

    let text = to_json_string(&collection.into(), EncodeOptions::default()).unwrap();
    let decoded = from_json_str(&text, &SchemaRegistry::default()).unwrap();
    let SchemaObject::Collection(decoded) = decoded else {
        panic!("expected a collection");
    };
    assert_eq!(decoded.name, "dailies");
    assert_eq!(decoded.len(), 2);
    let names: Vec<&str> = decoded
        .each_clip(None)
        .unwrap()
        .iter()
        .map(|clip| clip.item.name.as_str())
        .collect();
    assert_eq!(names, ["A", "B"]);
}

// ── Fractional times ───────────────────────────────────────────

fn time_at(value: f64, rate: f64) -> Value {
    json!({"OTIO_SCHEMA": "RationalTime.1", "rate": rate, "value": value})
}

fn fractional_clip(name: &str, start: f64, duration: f64, rate: f64) -> Value {
    json!({
        "OTIO_SCHEMA": "Clip.1",
        "metadata": {},
        "name": name,
        "source_range": {
            "OTIO_SCHEMA": "TimeRange.1",
            "start_time": time_at(start, rate),
            "duration": time_at(duration, rate),
        },
    })
}

#[test]
fn mixed_rate_fractional_times_compute_duration() {
    init_tracing();
    let document = json!({
        "OTIO_SCHEMA": "Timeline.1",
        "metadata": {},
        "name": "conform",
        "tracks": {
            "OTIO_SCHEMA": "Stack.1",
            "metadata": {},
            "name": "tracks",
            "children": [
                {
                    "OTIO_SCHEMA": "Track.1",
                    "metadata": {},
                    "name": "V1",
                    "kind": "Video",
                    "children": [
                        fractional_clip("a", 86400.123456789, 100.987654321, 23.976),
                        fractional_clip("b", 12.345678901, 48.765432109, 29.97),
                        fractional_clip("c", 3.14159265359, 7.77777777777, 59.94),
                    ],
                },
                {
                    "OTIO_SCHEMA": "Track.1",
                    "metadata": {},
                    "name": "A1",
                    "kind": "Audio",
                    "children": [fractional_clip("music", 0.5, 2881.333333333, 48000.0)],
                },
            ],
        },
    });
    let timeline =
        Timeline::from_json_str(&document.to_string(), &SchemaRegistry::default()).unwrap();

    let video = 100.987654321 / 23.976 + 48.765432109 / 29.97 + 7.77777777777 / 59.94;
    let duration = timeline.duration().unwrap();
    assert!((duration.to_seconds_f64() - video).abs() < 1e-5);

    let clips = timeline
        .each_clip(None)
        .unwrap()
        .collect::<timeweave_timeline::Result<Vec<_>>>()
        .unwrap();
    assert_eq!(clips.len(), 4);
    let c_start = timeline.range_of_child(clips[2]).unwrap().start_time;
    let expected = 100.987654321 / 23.976 + 48.765432109 / 29.97;
    assert!((c_start.to_seconds_f64() - expected).abs() < 1e-5);

    // The document can be written back out after the arithmetic above.
    let text = timeline.to_json_string(EncodeOptions::default()).unwrap();
    let reread = Timeline::from_json_str(&text, &SchemaRegistry::default()).unwrap();
    assert!(reread.duration().unwrap().almost_equal(duration, 1e-3));
}

// ── Schema versions and aliases ────────────────────────────────

#[test]
fn legacy_names_and_versions_are_upgraded() {
    init_tracing();
    let document = json!({
        "OTIO_SCHEMA": "Timeline.1",
        "metadata": {},
        "name": "legacy",
        "tracks": {
            "OTIO_SCHEMA": "Stack.1",
            "metadata": {},
            "name": "tracks",
            "children": [{
                "OTIO_SCHEMA": "Sequence.1",
                "metadata": {},
                "name": "V1",
                "kind": "Video",
                "children": [
                    {"OTIO_SCHEMA": "Filler.1", "metadata": {}, "name": "", "source_range": range(0, 6)},
                    {
                        "OTIO_SCHEMA": "Clip.1",
                        "metadata": {},
                        "name": "shot",
                        "source_range": range(0, 18),
                        "markers": [{
                            "OTIO_SCHEMA": "Marker.1",
                            "metadata": {},
                            "name": "old",
                            "color": "RED",
                            "range": range(3, 1),
                        }],
                    },
                ],
            }],
        },
    });
    let timeline =
        Timeline::from_json_str(&document.to_string(), &SchemaRegistry::default()).unwrap();
    assert_eq!(timeline.duration().unwrap(), RationalTime::new(24, 24));

    let written: Value =
        serde_json::from_str(&timeline.to_json_string(EncodeOptions::default()).unwrap()).unwrap();
    let track = &written["tracks"]["children"][0];
    assert_eq!(track["OTIO_SCHEMA"], "Track.1");
    assert_eq!(track["children"][0]["OTIO_SCHEMA"], "Gap.1");
    let marker = &track["children"][1]["markers"][0];
    assert_eq!(marker["OTIO_SCHEMA"], "Marker.2");
    assert_eq!(marker["color"], "RED");
    assert_eq!(marker["marked_range"]["start_time"]["value"], json!(3.0));
}

#[test]
fn newer_schema_version_is_rejected() {
    let document = json!({"OTIO_SCHEMA": "Gap.5", "metadata": {}, "name": ""});
    let result = from_json_str(&document.to_string(), &SchemaRegistry::default());
    assert!(matches!(
        result,
        Err(TimelineError::UnsupportedSchema { version: 5, max: 1, .. })
    ));
}

#[test]
fn non_timeline_document_is_not_a_timeline() {
    let document = json!({"OTIO_SCHEMA": "Gap.1", "metadata": {}, "name": "", "source_range": range(0, 1)});
    let result = Timeline::from_json_str(&document.to_string(), &SchemaRegistry::default());
    assert!(matches!(result, Err(TimelineError::TypeMismatch { .. })));
}

#[test]
fn custom_schema_upgrades_run_on_read() {
    fn rename_title(data: &mut timeweave_timeline::Metadata) {
        if let Some(title) = data.remove("title") {
            data.insert("name".to_string(), title);
        }
    }

    let mut registry = SchemaRegistry::default();
    assert!(registry.register_type("Storyboard", 2));
    assert!(registry.register_upgrade_function("Storyboard", 2, rename_title).unwrap());

    let document = json!({"OTIO_SCHEMA": "Storyboard.1", "title": "boards"});
    let SchemaObject::Unknown(object) = from_json_str(&document.to_string(), &registry).unwrap() else {
        panic!("expected an untyped object");
    };
    assert_eq!(object.schema_version, 2);
    assert_eq!(object.data["name"], "boards");
    assert!(object.data.get("title").is_none());
}

#[test]
fn garbage_is_a_json_error() {
    let result = from_json_str("{not json", &SchemaRegistry::default());
    assert!(matches!(result, Err(TimelineError::Json(_))));
}
