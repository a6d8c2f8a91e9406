use page_adapt::Page;

const TRACKER_PAGE: &str = r#"
<body>
  <nav class="navbar-modern">
    <a class="navbar-brand" href="/"><span class="brand-text">Time Tracker</span></a>
    <div class="nav-functional" data-measured-width="520">
      <ul id="primaryNavItems">
        <li data-functional-item data-measured-width="120">
          <a class="nav-link" href="/counters">Counters</a>
        </li>
        <li data-functional-item data-measured-width="140" data-functional-priority="70">
          <a class="nav-link" href="/reports">Reports</a>
        </li>
        <li data-functional-item data-measured-width="130" data-functional-priority="60">
          <a class="nav-link" href="/settings">Settings</a>
        </li>
        <li data-functional-item data-measured-width="110">
          <a class="nav-link" href="/help">Help</a>
        </li>
      </ul>
      <div class="compact-ellipsis-wrapper">
        <button class="nav-ellipsis-btn" data-bs-toggle="dropdown">&#8230;</button>
        <ul id="compactExtraMenu"></ul>
      </div>
    </div>
    <div class="nav-profile">
      <img class="avatar-thumb" src="/avatar.png">
      <span class="user-name" data-short-text data-short-limit="5">Alexander</span>
    </div>
  </nav>
  <main>
    <div class="alert alert-success show">
      Counter started
      <button class="btn-close" data-bs-dismiss="alert">x</button>
    </div>
    <div id="counters">
      <span id="active" data-interval-timer data-start="1970-01-01T00:00:00"></span>
      <span id="grand-total" data-total-duration data-total-base="7200"
            data-total-start="1970-01-01T00:00:00"></span>
    </div>
    <form id="stop-form" class="counter-action-form" method="post">
      <button id="stop-btn" type="submit">Stop</button>
    </form>
    <div id="time"></div>
    <span id="current-time"></span>
  </main>
</body>
"#;

#[test]
fn full_page_load_runs_both_engines() -> page_adapt::Result<()> {
    let mut page = Page::from_html(TRACKER_PAGE)?;
    page.set_clock_ms(90_000);
    page.load()?;
    page.advance_time(16)?;

    // Items total 500 against 520 - 16 = 504 available: everything fits.
    assert_eq!(page.relocated_count(), 0);
    page.assert_text("#active", "01:30")?;
    page.assert_text("#grand-total", "2 часа 01:30")?;
    page.assert_text("#time", "00:00")?;
    page.assert_text("#current-time", "00:01:30")?;
    Ok(())
}

#[test]
fn shrinking_the_viewport_relocates_and_shortens() -> page_adapt::Result<()> {
    let mut page = Page::from_html(TRACKER_PAGE)?;
    page.load()?;
    page.advance_time(16)?;

    page.set_measured_width(".nav-functional", 300)?;
    page.resize_to(700)?;
    page.advance_time(16)?;

    // 300 - 16 = 284 available against 500: Reports (70) then Settings (60)
    // relocate, leaving 230 inline.
    assert_eq!(page.relocated_count(), 2);
    assert_eq!(page.count("#compactExtraMenu li[data-overflow-clone]")?, 2);
    assert!(page.has_class(".compact-ellipsis-wrapper", "ellipsis-visible")?);
    assert!(page.has_class("body", "device-mobile-large")?);
    assert_eq!(page.text(".user-name")?, "Alexa\u{2026}");
    assert_eq!(page.style(".nav-profile .user-name", "display")?, "none !important");
    Ok(())
}

#[test]
fn recovery_after_a_resize_round_trip_is_clean() -> page_adapt::Result<()> {
    let mut page = Page::from_html(TRACKER_PAGE)?;
    page.load()?;
    page.advance_time(16)?;

    page.set_measured_width(".nav-functional", 200)?;
    page.resize_to(600)?;
    page.advance_time(16)?;
    assert!(page.relocated_count() > 0);

    page.set_measured_width(".nav-functional", 520)?;
    page.resize_to(1400)?;
    page.advance_time(16)?;

    assert_eq!(page.relocated_count(), 0);
    assert_eq!(page.count("#compactExtraMenu li[data-overflow-clone]")?, 0);
    assert_eq!(page.count("li.functional-placeholder")?, 0);
    assert_eq!(page.count("#primaryNavItems li[data-functional-item]")?, 4);
    assert_eq!(page.text(".user-name")?, "Alexander");
    assert!(page.has_class("body", "device-desktop-xl")?);
    Ok(())
}

#[test]
fn counters_survive_a_partial_update_cycle() -> page_adapt::Result<()> {
    let mut page = Page::from_html(TRACKER_PAGE)?;
    page.set_clock_ms(10_000);
    page.load()?;
    page.advance_time(16)?;

    page.begin_request("#stop-form")?;
    assert!(page.has_class("#stop-btn", "is-loading")?);

    page.swap_inner_html(
        "#counters",
        r#"<span id="active" data-interval-timer data-start="1970-01-01T00:00:05"></span>"#,
    )?;
    page.end_request("#stop-form")?;
    assert!(!page.has_class("#stop-btn", "is-loading")?);

    page.assert_text("#active", "00:05")?;
    page.advance_time(3_000)?;
    page.assert_text("#active", "00:08")?;
    Ok(())
}

#[test]
fn alert_lifecycle_does_not_disturb_the_timers() -> page_adapt::Result<()> {
    let mut page = Page::from_html(TRACKER_PAGE)?;
    page.load()?;
    page.advance_time(16)?;

    // The removal grace period is armed when the dismiss runs, so the
    // fade-out needs its own advance after the timeout fires.
    page.advance_time(5_000)?;
    assert!(!page.has_class(".alert", "show")?);
    page.advance_time(200)?;
    assert_eq!(page.count(".alert")?, 0);
    page.assert_text("#active", "00:05")?;
    page.assert_text("#time", "00:05")?;
    Ok(())
}

#[test]
fn repeated_body_swaps_keep_a_single_elapsed_count() -> page_adapt::Result<()> {
    let mut page = Page::from_html(TRACKER_PAGE)?;
    page.load()?;
    page.advance_time(20_000)?;
    page.assert_text("#time", "00:20")?;

    for _ in 0..3 {
        page.swap_inner_html("body", r#"<div id="time"></div>"#)?;
    }
    page.advance_time(4_000)?;
    page.assert_text("#time", "00:04")?;
    Ok(())
}
