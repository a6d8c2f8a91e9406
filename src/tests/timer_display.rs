use super::*;

#[test]
fn timer_renders_immediately_and_ticks_every_second() -> Result<()> {
    let html = r#"
    <body>
      <span id="t" data-interval-timer data-start="1970-01-01T00:00:00"></span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.set_clock_ms(60_000);
    page.load()?;
    page.assert_text("#t", "01:00")?;

    page.advance_time(1000)?;
    page.assert_text("#t", "01:01")?;
    page.advance_time(1000)?;
    page.assert_text("#t", "01:02")?;
    Ok(())
}

#[test]
fn elapsed_value_is_recomputed_from_the_start_instant() -> Result<()> {
    let html = r#"
    <body>
      <span id="t" data-interval-timer data-start="1970-01-01T00:00:00"></span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;

    // A long gap between ticks must not lose time: one big jump lands on the
    // same value as sixty small ones.
    page.advance_time(60_000)?;
    page.assert_text("#t", "01:00")?;
    Ok(())
}

#[test]
fn offset_is_added_to_the_elapsed_seconds() -> Result<()> {
    let html = r#"
    <body>
      <span id="t" data-interval-timer data-start="1970-01-01T00:00:00" data-offset="3600"></span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.assert_text("#t", "1 час 00:00")?;

    page.advance_time(5000)?;
    page.assert_text("#t", "1 час 00:05")?;
    Ok(())
}

#[test]
fn future_start_instants_clamp_to_zero() -> Result<()> {
    let html = r#"
    <body>
      <span id="t" data-interval-timer data-start="1970-01-01T01:00:00"></span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.assert_text("#t", "00:00")?;
    Ok(())
}

#[test]
fn timer_without_a_start_marker_is_left_alone() -> Result<()> {
    let html = r#"
    <body>
      <span id="t" data-interval-timer>idle</span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.advance_time(16)?;
    page.assert_text("#t", "idle")?;
    assert!(page.pending_timers().is_empty());
    Ok(())
}

#[test]
fn unparseable_start_marker_leaves_the_timer_uninitialized() -> Result<()> {
    let html = r#"
    <body>
      <span id="t" data-interval-timer data-start="yesterday-ish">idle</span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.advance_time(16)?;
    page.assert_text("#t", "idle")?;
    Ok(())
}

#[test]
fn legacy_timer_text_is_rewritten_on_first_scan() -> Result<()> {
    let html = r#"
    <body>
      <span id="t" data-interval-timer>2 ч 05 мин 30 секунд</span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    // No start marker, so the only change is the legacy text migration.
    page.assert_text("#t", "2 часа 05:30")?;
    Ok(())
}

#[test]
fn timer_tick_pulses_and_the_pulse_clears() -> Result<()> {
    let html = r#"
    <body>
      <span id="t" data-interval-timer data-start="1970-01-01T00:00:00"></span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    assert!(page.has_class("#t", "tick-animate")?);

    // The clear fires 600ms after the load-time tick; the next tick at
    // 1000ms re-adds the class.
    page.advance_time(600)?;
    assert!(!page.has_class("#t", "tick-animate")?);
    page.advance_time(400)?;
    assert!(page.has_class("#t", "tick-animate")?);
    Ok(())
}

#[test]
fn static_aggregate_renders_once_without_an_interval() -> Result<()> {
    let html = r#"
    <body>
      <span id="total" data-total-duration data-total-base="125"></span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.assert_text("#total", "02:05")?;

    let interval_count = page
        .pending_timers()
        .iter()
        .filter(|timer| timer.interval_ms.is_some())
        .count();
    assert_eq!(interval_count, 0);
    Ok(())
}

#[test]
fn live_aggregate_adds_elapsed_time_to_its_base() -> Result<()> {
    let html = r#"
    <body>
      <span id="total" data-total-duration data-total-base="3590"
            data-total-start="1970-01-01T00:00:00"></span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.set_clock_ms(5_000);
    page.load()?;
    page.assert_text("#total", "59:55")?;

    page.advance_time(5_000)?;
    page.assert_text("#total", "1 час 00:00")?;
    Ok(())
}

#[test]
fn aggregate_without_attributes_defaults_to_zero() -> Result<()> {
    let html = r#"
    <body>
      <span id="total" data-total-duration></span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.assert_text("#total", "00:00")?;
    Ok(())
}

#[test]
fn elapsed_widget_counts_from_load_time() -> Result<()> {
    let html = r#"
    <body>
      <div id="time"></div>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.set_clock_ms(1_000_000);
    page.load()?;
    page.assert_text("#time", "00:00")?;

    page.advance_time(3_000)?;
    page.assert_text("#time", "00:03")?;
    page.advance_time(57_000)?;
    page.assert_text("#time", "01:00")?;
    Ok(())
}

#[test]
fn elapsed_widget_migrates_legacy_text_before_counting() -> Result<()> {
    let html = r#"
    <body>
      <div id="time">0 ч 10 мин 09 секунд</div>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    // The immediate tick overwrites the migrated text with the fresh count.
    page.assert_text("#time", "00:00")?;
    Ok(())
}

#[test]
fn wall_clock_widget_shows_the_current_time() -> Result<()> {
    let html = r#"
    <body>
      <span id="current-time"></span>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.set_clock_ms(45_296_000);
    page.load()?;
    page.assert_text("#current-time", "12:34:56")?;

    page.advance_time(1_000)?;
    page.assert_text("#current-time", "12:34:57")?;
    Ok(())
}
