//! Integration tests for the composition model.
//!
//! Exercises timeweave-core time values flowing through
//! timeweave-timeline compositions.

use timeweave_core::{RationalTime, TimeRange};
use timeweave_timeline::{
    flatten_stack, track_trimmed_to_range, track_with_expanded_transitions, Arena, Clip,
    Composable, ComposableKind, ExpandedItem, FilterAction, Gap, MediaReference, NodeId,
    RangeProvider, Result, Stack, Timeline, TimelineError, Track, Transition,
};

use crate::init_tracing;

// ── Helpers ────────────────────────────────────────────────────

fn rt(v: i64) -> RationalTime {
    RationalTime::new(v, 24)
}

fn clip(arena: &mut Arena, name: &str, dur: i64) -> NodeId {
    arena.add(Clip::new(name).with_source_range(TimeRange::from_frames(0, dur, 24)))
}

/// V1: A(24) Gap(12) B(24); A1: music(60)
fn build_timeline() -> (Timeline, NodeId) {
    let mut timeline = Timeline::new("Integration Test Cut");
    let v1 = timeline.append_track(Track::new_video("V1")).unwrap();
    let a1 = timeline.append_track(Track::new_audio("A1")).unwrap();

    let arena = timeline.arena_mut();
    let a = clip(arena, "A", 24);
    let gap = arena.add(Gap::with_duration(rt(12)));
    let b = clip(arena, "B", 24);
    arena.set_children(v1, vec![a, gap, b]).unwrap();
    let music = clip(arena, "music", 60);
    arena.append_child(a1, music).unwrap();

    (timeline, v1)
}

fn names(arena: &Arena, ids: &[NodeId]) -> Vec<String> {
    ids.iter()
        .map(|id| arena.get(*id).unwrap().name().to_string())
        .collect()
}

// ── Timing ─────────────────────────────────────────────────────

#[test]
fn end_to_end_clip_gap_clip() {
    init_tracing();
    let mut timeline = Timeline::new("e2e");
    let v1 = timeline.append_track(Track::new_video("V1")).unwrap();
    let arena = timeline.arena_mut();
    let a = arena.add(Clip::new("A").with_source_range(TimeRange::from_frames(0, 24, 24)));
    let gap = arena.add(Gap::with_duration(RationalTime::new(12, 24)));
    let b = arena.add(Clip::new("B").with_source_range(TimeRange::from_frames(0, 24, 24)));
    arena.append_child(v1, a).unwrap();
    arena.append_child(v1, gap).unwrap();
    arena.append_child(v1, b).unwrap();

    assert_eq!(timeline.duration().unwrap().to_frames(24), 60);

    let arena = timeline.arena();
    let first_track = arena.child(timeline.tracks(), 0).unwrap();
    let third = arena.child(first_track, 2).unwrap();
    assert_eq!(third, b);
    assert_eq!(arena.range_in_parent(third).unwrap().start_time, rt(36));
}

#[test]
fn track_duration_is_sum_of_children() {
    let mut arena = Arena::new();
    let track = arena.add(Track::new_video("V1"));
    let a = clip(&mut arena, "a", 4);
    let g = arena.add(Gap::with_duration(rt(2)));
    let b = clip(&mut arena, "b", 3);
    arena.set_children(track, vec![a, g, b]).unwrap();

    assert_eq!(arena.duration(track).unwrap(), rt(9));
    let range = arena.composition(track).unwrap().range_of_child_at_index(&arena, 2).unwrap();
    assert_eq!(range, TimeRange::from_frames(6, 3, 24));
}

#[test]
fn stack_duration_is_longest_child() {
    let mut arena = Arena::new();
    let stack = arena.add(Stack::new("s"));
    let children = vec![clip(&mut arena, "a", 4), clip(&mut arena, "b", 9), clip(&mut arena, "c", 2)];
    arena.set_children(stack, children).unwrap();

    assert_eq!(arena.available_range(stack).unwrap().duration, rt(9));
    let provider = arena.composition(stack).unwrap();
    for i in 0..3 {
        assert!(provider.range_of_child_at_index(&arena, i).unwrap().start_time.is_zero());
    }
}

#[test]
fn transition_overlaps_neighbours() {
    let mut arena = Arena::new();
    let track = arena.add(Track::new_video("V1"));
    let a = clip(&mut arena, "A", 5);
    let t = arena.add(Transition::new("dissolve", rt(1), rt(1)));
    let b = clip(&mut arena, "B", 5);
    arena.set_children(track, vec![a, t, b]).unwrap();

    assert_eq!(arena.duration(track).unwrap(), rt(10));
    let provider = arena.composition(track).unwrap();
    assert_eq!(provider.range_of_child_at_index(&arena, 1).unwrap().start_time, rt(4));
}

#[test]
fn trimmed_range_equals_range_without_source_range() {
    let (timeline, v1) = build_timeline();
    let arena = timeline.arena();
    for composition in [v1, timeline.tracks()] {
        let provider = arena.composition(composition).unwrap();
        for i in 0..provider.children().len() {
            assert_eq!(
                provider.trimmed_range_of_child_at_index(arena, i).unwrap(),
                Some(provider.range_of_child_at_index(arena, i).unwrap())
            );
        }
    }
}

#[test]
fn mixed_rate_children_stay_exact() {
    let mut arena = Arena::new();
    let track = arena.add(Track::new_video("V1"));
    let a = arena.add(Clip::new("a").with_source_range(TimeRange::from_frames(0, 24, 24)));
    let b = arena.add(Clip::new("b").with_source_range(TimeRange::from_frames(0, 30, 30)));
    let c = arena.add(Clip::new("c").with_source_range(TimeRange::from_frames(0, 30000, 30000)));
    arena.set_children(track, vec![a, b, c]).unwrap();

    assert_eq!(arena.duration(track).unwrap(), RationalTime::new(3, 1));
    assert_eq!(arena.range_in_parent(c).unwrap().start_time, RationalTime::new(2, 1));
}

// ── Ownership ──────────────────────────────────────────────────

#[test]
fn moving_a_child_removes_it_from_the_old_parent() {
    let (mut timeline, v1) = build_timeline();
    let tracks = timeline.tracks();
    let arena = timeline.arena_mut();
    let v2 = arena.add(Track::new_video("V2"));
    arena.append_child(tracks, v2).unwrap();

    let a = arena.child(v1, 0).unwrap();
    arena.append_child(v2, a).unwrap();

    assert!(!arena.contains_child(v1, a).unwrap());
    assert_eq!(arena.parent(a).unwrap(), Some(v2));
    assert_eq!(names(arena, arena.children(v1).unwrap()), ["", "B"]);
}

#[test]
fn inserting_twice_fails_and_leaves_membership_alone() {
    let (mut timeline, v1) = build_timeline();
    let arena = timeline.arena_mut();
    let a = arena.child(v1, 0).unwrap();

    assert!(matches!(arena.append_child(v1, a), Err(TimelineError::AlreadyPresent)));
    assert_eq!(arena.children(v1).unwrap().len(), 3);
}

#[test]
fn a_track_cannot_contain_its_ancestor() {
    let (mut timeline, v1) = build_timeline();
    let tracks = timeline.tracks();
    assert!(matches!(
        timeline.arena_mut().append_child(v1, tracks),
        Err(TimelineError::WouldCreateCycle)
    ));
}

#[test]
fn discarded_nodes_are_gone() {
    let (mut timeline, v1) = build_timeline();
    let arena = timeline.arena_mut();
    let b = arena.child(v1, 2).unwrap();
    arena.discard(b).unwrap();

    assert!(matches!(arena.get(b), Err(TimelineError::NoSuchNode)));
    assert_eq!(timeline.arena().duration(v1).unwrap(), rt(36));
}

#[test]
fn ids_from_another_arena_are_rejected() {
    let (timeline, _) = build_timeline();
    let mut other = Arena::new();
    let stranger = other.add(Clip::new("x"));
    assert!(matches!(
        timeline.arena().get(stranger),
        Err(TimelineError::NoSuchNode)
    ));
}

// ── Queries ────────────────────────────────────────────────────

#[test]
fn each_clip_walks_tracks_in_order() {
    let (timeline, _) = build_timeline();
    let clips = timeline.each_clip(None).unwrap().collect::<Result<Vec<_>>>().unwrap();
    assert_eq!(names(timeline.arena(), &clips), ["A", "B", "music"]);

    let late = timeline
        .each_clip(Some(TimeRange::from_frames(40, 5, 24)))
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap();
    assert_eq!(names(timeline.arena(), &late), ["B", "music"]);
}

#[test]
fn each_child_kind_filter() {
    let (timeline, _) = build_timeline();
    let gaps = timeline
        .each_child(None, Some(ComposableKind::Gap), false)
        .unwrap()
        .count();
    let tracks = timeline
        .each_child(None, Some(ComposableKind::Track), false)
        .unwrap()
        .count();
    assert_eq!((gaps, tracks), (1, 2));
}

#[test]
fn child_at_time_descends_through_tracks() {
    let (timeline, _) = build_timeline();
    let arena = timeline.arena();
    let hit = arena.child_at_time(timeline.tracks(), rt(30), false).unwrap().unwrap();
    // First matching track in child order, then into its gap.
    assert_eq!(arena.get(hit).unwrap().kind(), ComposableKind::Gap);
}

#[test]
fn timeline_range_of_child_and_transformed_time() {
    let (timeline, v1) = build_timeline();
    let arena = timeline.arena();
    let b = arena.child(v1, 2).unwrap();
    assert_eq!(timeline.range_of_child(b).unwrap(), TimeRange::from_frames(36, 24, 24));

    let music = timeline.audio_tracks().unwrap()[0];
    let music_clip = arena.child(music, 0).unwrap();
    assert_eq!(arena.transformed_time(b, rt(0), music_clip).unwrap(), rt(36));
}

#[test]
fn clip_without_media_cannot_compute_duration() {
    let mut timeline = Timeline::new("broken");
    let v1 = timeline.append_track(Track::new_video("V1")).unwrap();
    let arena = timeline.arena_mut();
    let lost = arena.add(Clip::new("lost"));
    arena.append_child(v1, lost).unwrap();

    assert!(matches!(
        timeline.duration(),
        Err(TimelineError::CannotComputeDuration(name)) if name == "lost"
    ));
}

#[test]
fn clip_duration_from_media_reference() {
    let mut arena = Arena::new();
    let track = arena.add(Track::new_video("V1"));
    let c = arena.add(Clip::new("c").with_media_reference(MediaReference::external(
        "file:///media/a.mov",
        Some(TimeRange::from_frames(86400, 48, 24)),
    )));
    arena.append_child(track, c).unwrap();
    assert_eq!(arena.duration(track).unwrap(), rt(48));
    assert_eq!(arena.trimmed_range(c).unwrap().start_time, rt(86400));
}

// ── Algorithms ─────────────────────────────────────────────────

#[test]
fn trim_then_flatten_timeline() {
    init_tracing();
    let (mut timeline, v1) = build_timeline();
    let tracks = timeline.tracks();
    let arena = timeline.arena_mut();

    let trimmed = track_trimmed_to_range(arena, v1, TimeRange::from_frames(12, 36, 24)).unwrap();
    assert_eq!(arena.duration(trimmed).unwrap(), rt(36));
    assert_eq!(arena.parent(trimmed).unwrap(), None);

    // A1 is the top track and is fully covered by one clip.
    let flat = flatten_stack(arena, tracks).unwrap();
    let top_down = names(arena, arena.children(flat).unwrap());
    assert_eq!(top_down, ["music"]);
}

#[test]
fn flatten_video_over_background() {
    let mut arena = Arena::new();
    let stack = arena.add(Stack::new("layers"));
    let background = arena.add(Track::new_video("bg"));
    let fg = arena.add(Track::new_video("fg"));
    let plate = clip(&mut arena, "plate", 60);
    arena.append_child(background, plate).unwrap();
    let a = clip(&mut arena, "A", 24);
    let gap = arena.add(Gap::with_duration(rt(12)));
    let b = clip(&mut arena, "B", 24);
    arena.set_children(fg, vec![a, gap, b]).unwrap();
    arena.set_children(stack, vec![background, fg]).unwrap();

    let flat = flatten_stack(&mut arena, stack).unwrap();
    assert_eq!(names(&arena, arena.children(flat).unwrap()), ["A", "plate", "B"]);
    let plate_copy = arena.child(flat, 1).unwrap();
    assert_eq!(
        arena.get(plate_copy).unwrap().source_range(),
        Some(TimeRange::from_frames(24, 12, 24))
    );
    assert_eq!(arena.duration(flat).unwrap(), rt(60));
}

#[test]
fn filtered_timeline_drops_gaps() {
    init_tracing();
    let (mut timeline, v1) = build_timeline();
    timeline.global_start_time = Some(RationalTime::new(86400, 24));

    let filtered = timeline
        .filtered_items(|value| match value {
            Composable::Gap(_) => FilterAction::Remove,
            _ => FilterAction::Keep,
        })
        .unwrap();

    assert_eq!(filtered.name, timeline.name);
    assert_eq!(filtered.global_start_time, timeline.global_start_time);
    let arena = filtered.arena();
    let new_v1 = filtered.video_tracks().unwrap()[0];
    assert_eq!(names(arena, arena.children(new_v1).unwrap()), ["A", "B"]);
    assert_eq!(arena.duration(new_v1).unwrap(), rt(48));
    assert_eq!(filtered.audio_tracks().unwrap().len(), 1);

    // The source timeline still has its gap.
    assert_eq!(timeline.arena().duration(v1).unwrap(), rt(60));
}

#[test]
fn reduced_timeline_without_root_stack_is_empty() {
    let (timeline, _) = build_timeline();
    let reduced = timeline
        .reduced_items(|_, value, _| match value.kind() {
            ComposableKind::Stack => FilterAction::Remove,
            _ => FilterAction::Keep,
        })
        .unwrap();
    assert_eq!(reduced.name, timeline.name);
    assert!(reduced.arena().children(reduced.tracks()).unwrap().is_empty());
    assert_eq!(timeline.arena().children(timeline.tracks()).unwrap().len(), 2);
}

#[test]
fn expanded_transitions_cover_the_track() {
    let (mut timeline, v1) = build_timeline();
    let arena = timeline.arena_mut();
    let dissolve = arena.add(Transition::new("dissolve", rt(6), rt(6)));
    arena.insert_child(v1, 2, dissolve).unwrap();

    let expanded = track_with_expanded_transitions(arena, v1).unwrap();
    let ExpandedItem::Transition { pre, post, .. } = expanded[2] else {
        panic!("expected the dissolve to be expanded");
    };
    assert_eq!(arena.get(pre).unwrap().kind(), ComposableKind::Gap);
    assert_eq!(arena.duration(pre).unwrap(), rt(12));
    assert_eq!(arena.get(post).unwrap().name(), "B_transition_post");

    // Gap' + dissolve overlap + B' tile the 36 frames after A.
    let ExpandedItem::Item(gap) = expanded[1] else {
        panic!("expected the gap");
    };
    let ExpandedItem::Item(b) = expanded[3] else {
        panic!("expected B");
    };
    let total = arena.duration(gap).unwrap()
        + arena.duration(pre).unwrap()
        + arena.duration(b).unwrap();
    assert_eq!(total, rt(36));
}
