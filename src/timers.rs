use std::collections::HashMap;

use tracing::warn;

use crate::dom::{Dom, NodeId};
use crate::duration::{format_duration, format_wall_clock, from_legacy_format, parse_start_instant};
use crate::schedule::{Scheduler, TaskKind};
use crate::selector::query_all;
use crate::Result;

const TICK_CLASS: &str = "tick-animate";
const TICK_CLEAR_MS: i64 = 600;
const HIGHLIGHT_CLASS: &str = "badge-highlight";
const HIGHLIGHT_CLEAR_MS: i64 = 1200;

#[derive(Debug, Clone, Copy)]
pub(crate) struct TimerHandle {
    pub(crate) start_ms: i64,
    pub(crate) offset_seconds: f64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AggregateTimerHandle {
    pub(crate) base_seconds: i64,
    pub(crate) start_ms: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ElapsedWidget {
    started_at_ms: i64,
    interval_id: i64,
}

/// Registry membership is the idempotency guard: an element is initialized
/// exactly once for as long as it lives in the arena, no matter how many
/// scans see it.
#[derive(Debug, Default)]
pub(crate) struct TimerRegistry {
    pub(crate) timers: HashMap<NodeId, TimerHandle>,
    pub(crate) aggregates: HashMap<NodeId, AggregateTimerHandle>,
    pub(crate) elapsed_widget: Option<ElapsedWidget>,
    pub(crate) clock_started: bool,
}

pub(crate) fn scan_timers(
    dom: &mut Dom,
    sched: &mut Scheduler,
    registry: &mut TimerRegistry,
    scope: NodeId,
) -> Result<()> {
    for node in query_all(dom, scope, "[data-interval-timer]")? {
        if registry.timers.contains_key(&node) {
            continue;
        }
        migrate_legacy_text(dom, node)?;
        let Some(start_raw) = dom.attr(node, "data-start") else {
            continue;
        };
        let Some(start_ms) = parse_start_instant(&start_raw) else {
            warn!(start = %start_raw, "unparseable start instant, leaving timer uninitialized");
            continue;
        };
        let offset_seconds = dom
            .attr(node, "data-offset")
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .unwrap_or(0.0);

        sched.schedule(TaskKind::TimerTick(node), 1000, Some(1000));
        registry.timers.insert(
            node,
            TimerHandle {
                start_ms,
                offset_seconds,
            },
        );
        run_timer_tick(dom, sched, registry, node)?;
    }
    Ok(())
}

pub(crate) fn run_timer_tick(
    dom: &mut Dom,
    sched: &mut Scheduler,
    registry: &TimerRegistry,
    node: NodeId,
) -> Result<()> {
    let Some(handle) = registry.timers.get(&node).copied() else {
        return Ok(());
    };
    // Ticks into a detached element are tolerated as no-ops; see DESIGN.md.
    if !dom.is_connected(node) {
        return Ok(());
    }
    let elapsed_raw =
        ((sched.now_ms() - handle.start_ms) as f64 / 1000.0).floor() + handle.offset_seconds;
    let elapsed = (elapsed_raw.floor() as i64).max(0);
    dom.set_text_content(node, &format_duration(elapsed))?;
    pulse(dom, sched, node)?;
    Ok(())
}

pub(crate) fn scan_aggregates(
    dom: &mut Dom,
    sched: &mut Scheduler,
    registry: &mut TimerRegistry,
    scope: NodeId,
) -> Result<()> {
    for node in query_all(dom, scope, "[data-total-duration]")? {
        if registry.aggregates.contains_key(&node) {
            continue;
        }
        migrate_legacy_text(dom, node)?;
        let base_seconds = dom
            .attr(node, "data-total-base")
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(0);
        let start_ms = dom
            .attr(node, "data-total-start")
            .and_then(|raw| parse_start_instant(&raw));

        // No start instant means a static display: one render, no interval.
        if start_ms.is_some() {
            sched.schedule(TaskKind::AggregateTick(node), 1000, Some(1000));
        }
        registry.aggregates.insert(
            node,
            AggregateTimerHandle {
                base_seconds,
                start_ms,
            },
        );
        run_aggregate_tick(dom, sched, registry, node)?;
    }
    Ok(())
}

pub(crate) fn run_aggregate_tick(
    dom: &mut Dom,
    sched: &mut Scheduler,
    registry: &TimerRegistry,
    node: NodeId,
) -> Result<()> {
    let Some(handle) = registry.aggregates.get(&node).copied() else {
        return Ok(());
    };
    if !dom.is_connected(node) {
        return Ok(());
    }
    let mut total = handle.base_seconds;
    if let Some(start_ms) = handle.start_ms {
        let elapsed = (sched.now_ms() - start_ms) / 1000;
        total += elapsed.max(0);
    }
    dom.set_text_content(node, &format_duration(total))?;
    pulse(dom, sched, node)?;
    Ok(())
}

/// Replays the aggregate highlight for every counter in scope, initialized or
/// not, so swapped-in content draws attention the same way a fresh load does.
pub(crate) fn replay_aggregate_pulse(
    dom: &mut Dom,
    sched: &mut Scheduler,
    scope: NodeId,
) -> Result<()> {
    for node in query_all(dom, scope, "[data-total-duration]")? {
        dom.add_class(node, HIGHLIGHT_CLASS)?;
        sched.schedule(
            TaskKind::PulseClear {
                node,
                class: HIGHLIGHT_CLASS.to_string(),
            },
            HIGHLIGHT_CLEAR_MS,
            None,
        );
    }
    Ok(())
}

fn pulse(dom: &mut Dom, sched: &mut Scheduler, node: NodeId) -> Result<()> {
    // Remove-then-add restarts the CSS animation in a real browser.
    dom.remove_class(node, TICK_CLASS)?;
    dom.add_class(node, TICK_CLASS)?;
    sched.schedule(
        TaskKind::PulseClear {
            node,
            class: TICK_CLASS.to_string(),
        },
        TICK_CLEAR_MS,
        None,
    );
    Ok(())
}

fn migrate_legacy_text(dom: &mut Dom, node: NodeId) -> Result<()> {
    let text = dom.text_content(node);
    if let Some(compact) = from_legacy_format(&text) {
        dom.set_text_content(node, &compact)?;
    }
    Ok(())
}

pub(crate) fn start_elapsed_widget(
    dom: &mut Dom,
    sched: &mut Scheduler,
    registry: &mut TimerRegistry,
) -> Result<()> {
    if registry.elapsed_widget.is_some() {
        return Ok(());
    }
    let Some(node) = dom.by_id("time") else {
        return Ok(());
    };
    migrate_legacy_text(dom, node)?;
    let interval_id = sched.schedule(TaskKind::ElapsedWidgetTick, 1000, Some(1000));
    registry.elapsed_widget = Some(ElapsedWidget {
        started_at_ms: sched.now_ms(),
        interval_id,
    });
    run_elapsed_tick(dom, sched, registry)?;
    Ok(())
}

pub(crate) fn stop_elapsed_widget(sched: &mut Scheduler, registry: &mut TimerRegistry) {
    if let Some(widget) = registry.elapsed_widget.take() {
        sched.cancel(widget.interval_id);
    }
}

pub(crate) fn run_elapsed_tick(
    dom: &mut Dom,
    sched: &mut Scheduler,
    registry: &TimerRegistry,
) -> Result<()> {
    let Some(widget) = registry.elapsed_widget else {
        return Ok(());
    };
    // Recomputed from the start instant each tick; tick drift never
    // accumulates into the displayed value.
    let elapsed = ((sched.now_ms() - widget.started_at_ms) / 1000).max(0);
    if let Some(node) = dom.by_id("time") {
        dom.set_text_content(node, &format_duration(elapsed))?;
    }
    Ok(())
}

pub(crate) fn start_clock(
    dom: &mut Dom,
    sched: &mut Scheduler,
    registry: &mut TimerRegistry,
) -> Result<()> {
    if registry.clock_started || dom.by_id("current-time").is_none() {
        return Ok(());
    }
    registry.clock_started = true;
    sched.schedule(TaskKind::ClockTick, 1000, Some(1000));
    run_clock_tick(dom, sched)?;
    Ok(())
}

pub(crate) fn run_clock_tick(dom: &mut Dom, sched: &mut Scheduler) -> Result<()> {
    if let Some(node) = dom.by_id("current-time") {
        dom.set_text_content(node, &format_wall_clock(sched.now_ms()))?;
    }
    Ok(())
}
