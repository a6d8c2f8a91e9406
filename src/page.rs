use std::collections::{HashMap, HashSet};

use crate::dom::{Dom, NodeId};
use crate::html;
use crate::layout::{DeviceCategory, LayoutEngine};
use crate::schedule::{PendingTimer, Scheduler, TaskKind};
use crate::selector::{query_all, query_one};
use crate::timers::{self, TimerRegistry};
use crate::widgets::{
    self, AlertController, DropdownStrategy, FallbackDropdowns, FormLoadingState, LibraryDropdowns,
};
use crate::{Error, Result};

const FRAME_DELAY_MS: i64 = 16;
const SETTLE_RESCAN_DELAY_MS: i64 = 150;

/// A parsed page plus the two engines and their virtual clock. Drives the
/// same behavior a browser would: `load` is document-ready, `resize_to`
/// schedules a debounced adaptation frame, `swap_inner_html` is a partial
/// page update, and `advance_time` / `flush` run whatever became due.
#[derive(Debug)]
pub struct Page {
    dom: Dom,
    scheduler: Scheduler,
    layout: LayoutEngine,
    timers: TimerRegistry,
    alerts: AlertController,
    forms: FormLoadingState,
    dropdowns: Box<dyn DropdownStrategy>,
    dropdown_toggles: HashSet<NodeId>,
    measured_widths: HashMap<NodeId, i32>,
    viewport_width: i32,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        let dom = html::parse_fragment(html)?;
        Ok(Self {
            dom,
            scheduler: Scheduler::default(),
            layout: LayoutEngine::default(),
            timers: TimerRegistry::default(),
            alerts: AlertController::default(),
            forms: FormLoadingState::default(),
            dropdowns: Box::new(FallbackDropdowns::default()),
            dropdown_toggles: HashSet::new(),
            measured_widths: HashMap::new(),
            viewport_width: 1280,
        })
    }

    /// Selects the dropdown strategy. With a widget library present the page
    /// only registers toggles and leaves behavior to the library; otherwise a
    /// minimal toggle/outside-close fallback is used. Call before `load`.
    pub fn use_widget_library(&mut self, enabled: bool) {
        self.dropdowns = if enabled {
            Box::new(LibraryDropdowns::default())
        } else {
            Box::new(FallbackDropdowns::default())
        };
    }

    pub fn viewport_width(&self) -> i32 {
        self.viewport_width
    }

    pub fn set_viewport_width(&mut self, width: i32) {
        self.viewport_width = width;
    }

    pub fn device_category(&self) -> DeviceCategory {
        DeviceCategory::from_viewport(self.viewport_width)
    }

    /// Records a rendered width for every element matched by the selector.
    /// The headless DOM has no layout engine, so measurements are supplied by
    /// the caller (falling back to a `data-measured-width` attribute).
    pub fn set_measured_width(&mut self, selector: &str, width: i32) -> Result<()> {
        let matches = query_all(&self.dom, self.dom.root(), selector)?;
        if matches.is_empty() {
            return Err(Error::SelectorNotFound(selector.to_string()));
        }
        for node in matches {
            self.measured_widths.insert(node, width);
        }
        Ok(())
    }

    pub fn now_ms(&self) -> i64 {
        self.scheduler.now_ms()
    }

    /// Sets the wall clock (epoch milliseconds). Intended for positioning the
    /// clock before `load` so `data-start` markers produce meaningful elapsed
    /// values.
    pub fn set_clock_ms(&mut self, now_ms: i64) {
        self.scheduler.set_now_ms(now_ms);
    }

    /// Document-ready: scans the whole document for timers, aggregates,
    /// alerts and dropdowns, starts the elapsed and clock widgets, and
    /// schedules the initial adaptation frame.
    pub fn load(&mut self) -> Result<()> {
        let root = self.dom.root();
        self.rescan(root)?;
        timers::start_elapsed_widget(&mut self.dom, &mut self.scheduler, &mut self.timers)?;
        timers::start_clock(&mut self.dom, &mut self.scheduler, &mut self.timers)?;
        self.schedule_adapt_frame();
        Ok(())
    }

    /// Viewport resize: debounced to a single pending animation frame; a
    /// resize burst replaces the pending frame instead of stacking passes.
    pub fn resize_to(&mut self, width: i32) -> Result<()> {
        self.viewport_width = width;
        self.schedule_adapt_frame();
        Ok(())
    }

    fn schedule_adapt_frame(&mut self) {
        if let Some(pending) = self.layout.pending_frame.take() {
            self.scheduler.cancel(pending);
        }
        self.layout.pending_frame =
            Some(self.scheduler.schedule(TaskKind::AdaptFrame, FRAME_DELAY_MS, None));
    }

    /// Replaces the target's children with freshly parsed content and runs
    /// the partial-update lifecycle around it: a body swap stops the elapsed
    /// widget first; afterwards the swapped subtree is re-scanned and a
    /// delayed settle re-scan is scheduled for content that lands late.
    pub fn swap_inner_html(&mut self, selector: &str, html: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let is_body_swap = self
            .dom
            .tag_name(target)
            .map(|tag| tag.eq_ignore_ascii_case("body"))
            .unwrap_or(false);

        if is_body_swap {
            timers::stop_elapsed_widget(&mut self.scheduler, &mut self.timers);
        }

        self.dom.set_inner_html(target, html)?;

        self.rescan(target)?;
        if is_body_swap {
            timers::start_elapsed_widget(&mut self.dom, &mut self.scheduler, &mut self.timers)?;
        }
        self.scheduler
            .schedule(TaskKind::Rescan(target), SETTLE_RESCAN_DELAY_MS, None);
        Ok(())
    }

    fn rescan(&mut self, scope: NodeId) -> Result<()> {
        timers::scan_timers(&mut self.dom, &mut self.scheduler, &mut self.timers, scope)?;
        timers::scan_aggregates(&mut self.dom, &mut self.scheduler, &mut self.timers, scope)?;
        timers::replay_aggregate_pulse(&mut self.dom, &mut self.scheduler, scope)?;
        self.alerts
            .scan(&mut self.dom, &mut self.scheduler, scope)?;
        self.scan_dropdowns(scope)?;
        Ok(())
    }

    fn scan_dropdowns(&mut self, scope: NodeId) -> Result<()> {
        for toggle in query_all(&self.dom, scope, r#"[data-bs-toggle="dropdown"]"#)? {
            if !self.dropdown_toggles.insert(toggle) {
                continue;
            }
            self.dropdowns.register(&self.dom, toggle)?;
        }
        Ok(())
    }

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        if self.dom.has_attr(target, "disabled") {
            return Ok(());
        }

        if self
            .alerts
            .handle_click(&mut self.dom, &mut self.scheduler, target)?
        {
            return Ok(());
        }

        // Toggle listeners run before the document-level outside-close, as
        // click bubbling would order them in a browser.
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            if self.dropdown_toggles.contains(&node) {
                self.dropdowns.on_toggle_click(&mut self.dom, node)?;
                break;
            }
            cursor = self.dom.parent(node);
        }
        self.dropdowns.on_document_click(&mut self.dom, target)?;
        Ok(())
    }

    /// Marks a partial-update form as in flight (loading state on its submit
    /// button). Only forms opting in via the `counter-action-form` class are
    /// affected.
    pub fn begin_request(&mut self, selector: &str) -> Result<()> {
        let form = self.select_one(selector)?;
        if !self.dom.has_class(form, "counter-action-form") {
            return Ok(());
        }
        widgets::set_loading_state(&mut self.dom, &mut self.forms, form, true)
    }

    /// Clears the loading state when the request settles (success or error).
    /// A form that was swapped out of the document is left alone.
    pub fn end_request(&mut self, selector: &str) -> Result<()> {
        let Some(form) = query_one(&self.dom, self.dom.root(), selector)? else {
            return Ok(());
        };
        if !self.dom.has_class(form, "counter-action-form") {
            return Ok(());
        }
        widgets::set_loading_state(&mut self.dom, &mut self.forms, form, false)
    }

    pub fn advance_time(&mut self, delta_ms: i64) -> Result<()> {
        if delta_ms < 0 {
            return Err(Error::Scheduler(
                "advance_time requires non-negative milliseconds".into(),
            ));
        }
        let target = self.scheduler.now_ms().saturating_add(delta_ms);
        self.scheduler.advance_to(target)?;
        self.run_timer_queue(Some(target), false)?;
        Ok(())
    }

    pub fn advance_time_to(&mut self, target_ms: i64) -> Result<()> {
        self.scheduler.advance_to(target_ms)?;
        self.run_timer_queue(Some(target_ms), false)?;
        Ok(())
    }

    pub fn run_due_timers(&mut self) -> Result<usize> {
        self.run_timer_queue(Some(self.scheduler.now_ms()), false)
    }

    /// Runs every queued task, advancing the clock to each task's due time.
    /// Pages with live intervals will hit the step limit here; drive those
    /// with `advance_time` instead.
    pub fn flush(&mut self) -> Result<()> {
        self.run_timer_queue(None, true)?;
        Ok(())
    }

    pub fn set_timer_step_limit(&mut self, max_steps: usize) -> Result<()> {
        self.scheduler.set_step_limit(max_steps)
    }

    pub fn pending_timers(&self) -> Vec<PendingTimer> {
        self.scheduler.pending()
    }

    fn run_timer_queue(&mut self, due_limit: Option<i64>, advance_clock: bool) -> Result<usize> {
        let mut steps = 0usize;
        while let Some(task) = self.scheduler.take_next(due_limit, advance_clock) {
            steps += 1;
            if steps > self.scheduler.step_limit() {
                return Err(Error::Scheduler(format!(
                    "timer step limit exceeded (limit={}, due_limit={})",
                    self.scheduler.step_limit(),
                    due_limit
                        .map(|value| value.to_string())
                        .unwrap_or_else(|| "none".into()),
                )));
            }
            let kind = task.kind.clone();
            self.execute_task(kind)?;
            self.scheduler.finish_running(task);
        }
        Ok(steps)
    }

    fn execute_task(&mut self, kind: TaskKind) -> Result<()> {
        match kind {
            TaskKind::TimerTick(node) => {
                timers::run_timer_tick(&mut self.dom, &mut self.scheduler, &self.timers, node)
            }
            TaskKind::AggregateTick(node) => {
                timers::run_aggregate_tick(&mut self.dom, &mut self.scheduler, &self.timers, node)
            }
            TaskKind::ElapsedWidgetTick => {
                timers::run_elapsed_tick(&mut self.dom, &mut self.scheduler, &self.timers)
            }
            TaskKind::ClockTick => timers::run_clock_tick(&mut self.dom, &mut self.scheduler),
            TaskKind::PulseClear { node, class } => {
                if self.dom.element(node).is_some() {
                    self.dom.remove_class(node, &class)?;
                }
                Ok(())
            }
            TaskKind::AlertDismiss(node) => {
                widgets::dismiss_alert(&mut self.dom, &mut self.scheduler, node)
            }
            TaskKind::AlertRemove(node) => {
                if self.dom.parent(node).is_some() {
                    self.dom.remove_node(node)?;
                }
                Ok(())
            }
            TaskKind::AdaptFrame => {
                self.layout.pending_frame = None;
                self.layout
                    .run_adapt_pass(&mut self.dom, &self.measured_widths, self.viewport_width)
            }
            TaskKind::Rescan(scope) => {
                if self.dom.is_valid_node(scope) && self.dom.is_connected(scope) {
                    self.rescan(scope)?;
                }
                Ok(())
            }
        }
    }

    pub fn relocated_count(&self) -> usize {
        self.layout.overflow.len()
    }

    fn select_one(&self, selector: &str) -> Result<NodeId> {
        query_one(&self.dom, self.dom.root(), selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub fn exists(&self, selector: &str) -> Result<bool> {
        Ok(query_one(&self.dom, self.dom.root(), selector)?.is_some())
    }

    pub fn count(&self, selector: &str) -> Result<usize> {
        Ok(query_all(&self.dom, self.dom.root(), selector)?.len())
    }

    pub fn text(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.text_content(target))
    }

    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.attr(target, name))
    }

    pub fn has_class(&self, selector: &str, class_name: &str) -> Result<bool> {
        let target = self.select_one(selector)?;
        Ok(self.dom.has_class(target, class_name))
    }

    pub fn classes(&self, selector: &str) -> Result<Vec<String>> {
        let target = self.select_one(selector)?;
        Ok(self.dom.class_list(target))
    }

    pub fn style(&self, selector: &str, prop: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        self.dom.style_get(target, prop)
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_one(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_one(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.dom.dump_node(target),
            });
        }
        Ok(())
    }
}
