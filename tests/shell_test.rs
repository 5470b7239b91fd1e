//! Console shell tests
//!
//! Feeds command lines to the shell and checks the replies and the state.

mod common;

use announcer::schedule::{Countdown, ScheduleState};
use announcer::state::ModeKind;
use announcer::ui::{Shell, ShellAction};
use common::Harness;

/// Run `lines` through a non-interactive shell, returning the output
fn run(h: &mut Harness, shell: &mut Shell, lines: &[&str]) -> String {
    let mut out = Vec::new();
    for line in lines {
        let action = shell.handle_line(&mut h.state, line, &mut out).expect("handle");
        assert_eq!(action, ShellAction::Continue, "{} quit the shell", line);
    }
    String::from_utf8(out).expect("utf-8 output")
}

#[test]
fn test_greeting_lists_warnings() {
    let h = Harness::new();
    let shell = Shell::new(false);
    let mut out = Vec::new();
    shell.greet(&h.state, &mut out).expect("greet");

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Speech engine: fake (2 voices)"));
    assert!(text.contains("⚠ Advanced audio control is unavailable"));
}

#[test]
fn test_fields_and_templates() {
    let mut h = Harness::new();
    let mut shell = Shell::new(false);

    let out = run(
        &mut h,
        &mut shell,
        &["title 점심 안내", "script 점심 시간입니다.", "save", "templates"],
    );

    assert!(out.contains("Saved as template 1"));
    assert!(out.contains("*   1. 점심 안내"));
    assert_eq!(h.state.templates.len(), 1);

    let out = run(&mut h, &mut shell, &["pick 0", "title", "script", "pick 1"]);
    assert!(out.contains("Loaded '점심 안내'"));
    assert_eq!(h.state.fields.script, "점심 시간입니다.");
}

#[test]
fn test_delete_asks_first() {
    let mut h = Harness::new();
    let mut shell = Shell::new(false);
    run(&mut h, &mut shell, &["title Drill", "script Leave now", "save"]);

    let out = run(&mut h, &mut shell, &["delete", "n"]);
    assert!(out.contains("Really delete 'Drill'? (y/n)"));
    assert!(out.contains("Delete cancelled"));
    assert_eq!(h.state.templates.len(), 1);

    let out = run(&mut h, &mut shell, &["delete", "yes"]);
    assert!(out.contains("Deleted 'Drill'"));
    assert!(h.state.templates.is_empty());
}

#[test]
fn test_delete_without_selection_is_silent() {
    let mut h = Harness::new();
    let mut shell = Shell::new(false);
    let out = run(&mut h, &mut shell, &["delete"]);
    assert!(out.is_empty());

    // The next line is an ordinary command, not an answer
    run(&mut h, &mut shell, &["title y"]);
    assert_eq!(h.state.fields.title, "y");
}

#[test]
fn test_mistakes_are_reported_not_fatal() {
    let mut h = Harness::new();
    let mut shell = Shell::new(false);

    let out = run(
        &mut h,
        &mut shell,
        &["launch", "voice 9", "timer 0 0 0", "start", "save"],
    );
    assert!(out.contains("⚠ Unknown command 'launch'"));
    assert!(out.contains("⚠ No voice number 9"));
    assert!(out.contains("⚠ Enter a script first"));
    assert!(out.contains("⚠ Enter both a title and a script"));
    assert_eq!(h.state.schedule_state(), ScheduleState::Idle);
}

#[test]
fn test_selectors_are_one_based() {
    let mut h = Harness::new();
    let mut shell = Shell::new(false);

    let out = run(&mut h, &mut shell, &["voices", "voice 1"]);
    assert!(out.contains("*   2. Korean (ko)"));
    assert!(out.contains("Voice: English (en)"));
    assert_eq!(h.state.selected_voice_index(), Some(0));

    let out = run(&mut h, &mut shell, &["devices", "device 1"]);
    assert!(out.contains("*   1. System default device"));
}

#[test]
fn test_timer_schedules_broadcast() {
    let mut h = Harness::new();
    let mut shell = Shell::new(false);

    run(
        &mut h,
        &mut shell,
        &["script Closing in ten minutes", "timer 0:10:00", "start"],
    );
    assert_eq!(h.state.fields.mode, ModeKind::Timer);
    assert_eq!(h.state.fields.countdown, Countdown::new(0, 10, 0));
    assert!(matches!(h.state.schedule_state(), ScheduleState::Armed { .. }));

    let out = run(&mut h, &mut shell, &["start", "status"]);
    assert!(out.contains("A broadcast is already scheduled"));
    assert!(out.contains("Schedule: armed for 2024-05-01 12:10:00"));

    run(&mut h, &mut shell, &["stop"]);
    assert_eq!(h.state.schedule_state(), ScheduleState::Idle);
}

#[test]
fn test_oversized_timer_reported() {
    let mut h = Harness::new();
    let mut shell = Shell::new(false);

    let out = run(
        &mut h,
        &mut shell,
        &["script Far future", "timer 4294967295 0 0", "start"],
    );
    assert!(out.contains("⚠ Countdown is too long"));
    assert_eq!(h.state.schedule_state(), ScheduleState::Idle);
}

#[test]
fn test_quit() {
    let mut h = Harness::new();
    let mut shell = Shell::new(false);
    let mut out = Vec::new();
    let action = shell.handle_line(&mut h.state, "quit", &mut out).expect("handle");
    assert_eq!(action, ShellAction::Quit);
}
