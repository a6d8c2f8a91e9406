use super::*;

mod timer_display;
mod widget_behavior;

/// A navigation bar with three functional items of 100px each inside a 250px
/// container. Available space is 250 - 16 = 234, so one item must relocate.
fn nav_fixture() -> &'static str {
    r#"
    <body>
      <nav class="navbar-modern">
        <a class="navbar-brand" href="/"><span class="brand-text">Tracker</span></a>
        <div class="nav-functional" data-measured-width="250">
          <ul id="primaryNavItems">
            <li data-functional-item data-measured-width="100">
              <a class="nav-link" href="/alpha">Alpha</a>
            </li>
            <li data-functional-item data-measured-width="100" data-functional-priority="90">
              <a class="nav-link" href="/beta">Beta</a>
            </li>
            <li data-functional-item data-measured-width="100">
              <a class="nav-link" href="/gamma">Gamma</a>
            </li>
          </ul>
          <div class="compact-ellipsis-wrapper">
            <button class="nav-ellipsis-btn" data-bs-toggle="dropdown">&#8230;</button>
            <ul id="compactExtraMenu"></ul>
          </div>
        </div>
      </nav>
    </body>
    "#
}

fn loaded_nav_page() -> Result<Page> {
    let mut page = Page::from_html(nav_fixture())?;
    page.load()?;
    page.advance_time(16)?;
    Ok(page)
}

#[test]
fn load_runs_the_initial_adaptation_frame() -> Result<()> {
    let page = loaded_nav_page()?;
    assert!(page.has_class("body", "device-desktop-large")?);
    assert_eq!(page.relocated_count(), 1);
    Ok(())
}

#[test]
fn page_without_nav_or_timers_loads_quietly() -> Result<()> {
    let mut page = Page::from_html("<body><p>plain</p></body>")?;
    page.load()?;
    page.flush()?;
    assert_eq!(page.relocated_count(), 0);
    assert!(page.pending_timers().is_empty());
    Ok(())
}

#[test]
fn assert_text_failure_carries_a_dom_snippet() -> Result<()> {
    let mut page = Page::from_html(r#"<body><p id="msg">hello</p></body>"#)?;
    page.load()?;
    let err = page.assert_text("#msg", "goodbye").unwrap_err();
    match err {
        Error::AssertionFailed {
            expected,
            actual,
            dom_snippet,
            ..
        } => {
            assert_eq!(expected, "goodbye");
            assert_eq!(actual, "hello");
            assert!(dom_snippet.contains("<p"));
        }
        other => panic!("unexpected error: {other}"),
    }
    Ok(())
}

#[test]
fn advance_time_rejects_negative_deltas() -> Result<()> {
    let mut page = Page::from_html("<body></body>")?;
    assert!(page.advance_time(-1).is_err());
    Ok(())
}

#[test]
fn step_limit_aborts_a_runaway_queue() -> Result<()> {
    let html = r#"
    <body>
      <div data-interval-timer data-start="1970-01-01T00:00:00">00:00</div>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.set_timer_step_limit(5)?;
    let err = page.flush().unwrap_err();
    assert!(matches!(err, Error::Scheduler(_)));
    Ok(())
}
