use super::*;

fn alert_fixture() -> &'static str {
    r#"
    <body>
      <div class="alert alert-info show">
        saved
        <button type="button" class="btn-close" data-bs-dismiss="alert">
          <span class="close-icon">x</span>
        </button>
      </div>
    </body>
    "#
}

#[test]
fn alerts_auto_dismiss_after_the_default_timeout() -> Result<()> {
    let mut page = Page::from_html(alert_fixture())?;
    page.load()?;
    assert!(page.has_class(".alert", "show")?);

    page.advance_time(5_000)?;
    assert!(!page.has_class(".alert", "show")?);
    // The fade-out grace period removes the node itself.
    page.advance_time(200)?;
    assert_eq!(page.count(".alert")?, 0);
    Ok(())
}

#[test]
fn zero_timeout_disables_auto_dismiss() -> Result<()> {
    let html = r#"
    <body>
      <div class="alert show" data-dismiss-timeout="0">sticky</div>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.advance_time(60_000)?;
    assert!(page.has_class(".alert", "show")?);
    Ok(())
}

#[test]
fn custom_timeout_overrides_the_default() -> Result<()> {
    let html = r#"
    <body>
      <div class="alert show" data-dismiss-timeout="1000">quick</div>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.advance_time(999)?;
    assert!(page.has_class(".alert", "show")?);
    page.advance_time(1)?;
    assert!(!page.has_class(".alert", "show")?);
    Ok(())
}

#[test]
fn close_button_dismisses_immediately() -> Result<()> {
    let mut page = Page::from_html(alert_fixture())?;
    page.load()?;
    page.click(".btn-close")?;
    assert!(!page.has_class(".alert", "show")?);
    page.advance_time(200)?;
    assert_eq!(page.count(".alert")?, 0);
    Ok(())
}

#[test]
fn click_on_an_icon_inside_the_close_button_still_dismisses() -> Result<()> {
    let mut page = Page::from_html(alert_fixture())?;
    page.load()?;
    page.click(".close-icon")?;
    assert!(!page.has_class(".alert", "show")?);
    Ok(())
}

#[test]
fn removal_grace_period_is_armed_from_the_drain_time() -> Result<()> {
    let mut page = Page::from_html(alert_fixture())?;
    page.load()?;

    // A single jump past the timeout runs the dismiss late, and the removal
    // one-shot is armed 200ms after that drain, not after the nominal due
    // time: the faded alert is still in the tree until the next advance.
    page.advance_time(5_100)?;
    assert!(!page.has_class(".alert", "show")?);
    assert_eq!(page.count(".alert")?, 1);

    page.advance_time(200)?;
    assert_eq!(page.count(".alert")?, 0);
    Ok(())
}

#[test]
fn stale_auto_dismiss_after_a_manual_close_is_harmless() -> Result<()> {
    let mut page = Page::from_html(alert_fixture())?;
    page.load()?;
    page.click(".btn-close")?;
    page.advance_time(10_000)?;
    assert_eq!(page.count(".alert")?, 0);
    Ok(())
}

fn dropdown_fixture() -> &'static str {
    r#"
    <body>
      <div class="dropdown">
        <button id="dd" data-bs-toggle="dropdown">Menu</button>
        <ul id="ddmenu" class="dropdown-menu">
          <li><a id="ddlink" href="/settings">Settings</a></li>
        </ul>
      </div>
      <p id="outside">elsewhere</p>
    </body>
    "#
}

#[test]
fn fallback_dropdown_toggles_on_click() -> Result<()> {
    let mut page = Page::from_html(dropdown_fixture())?;
    page.load()?;

    page.click("#dd")?;
    assert!(page.has_class("#ddmenu", "show")?);
    page.click("#dd")?;
    assert!(!page.has_class("#ddmenu", "show")?);
    Ok(())
}

#[test]
fn outside_click_closes_an_open_dropdown() -> Result<()> {
    let mut page = Page::from_html(dropdown_fixture())?;
    page.load()?;

    page.click("#dd")?;
    page.click("#outside")?;
    assert!(!page.has_class("#ddmenu", "show")?);
    Ok(())
}

#[test]
fn click_inside_the_menu_keeps_it_open() -> Result<()> {
    let mut page = Page::from_html(dropdown_fixture())?;
    page.load()?;

    page.click("#dd")?;
    page.click("#ddlink")?;
    assert!(page.has_class("#ddmenu", "show")?);
    Ok(())
}

#[test]
fn widget_library_mode_defers_dropdown_behavior() -> Result<()> {
    let mut page = Page::from_html(dropdown_fixture())?;
    page.use_widget_library(true);
    page.load()?;

    page.click("#dd")?;
    assert!(!page.has_class("#ddmenu", "show")?);
    Ok(())
}

#[test]
fn swapped_in_dropdowns_are_registered() -> Result<()> {
    let html = r#"
    <body>
      <div id="panel"></div>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.swap_inner_html(
        "#panel",
        r#"<button id="dd2" data-bs-toggle="dropdown">More</button>
           <ul id="ddmenu2"><li>entry</li></ul>"#,
    )?;

    page.click("#dd2")?;
    assert!(page.has_class("#ddmenu2", "show")?);
    Ok(())
}

fn form_fixture() -> &'static str {
    r#"
    <body>
      <form id="f" class="counter-action-form" method="post">
        <button id="b" type="submit">Start</button>
      </form>
    </body>
    "#
}

#[test]
fn in_flight_forms_disable_their_button() -> Result<()> {
    let mut page = Page::from_html(form_fixture())?;
    page.load()?;

    page.begin_request("#f")?;
    assert!(page.has_class("#b", "is-loading")?);
    assert!(page.attr("#b", "disabled")?.is_some());

    page.end_request("#f")?;
    assert!(!page.has_class("#b", "is-loading")?);
    assert!(page.attr("#b", "disabled")?.is_none());
    Ok(())
}

#[test]
fn clicks_on_a_loading_button_are_ignored() -> Result<()> {
    let mut page = Page::from_html(form_fixture())?;
    page.load()?;
    page.begin_request("#f")?;
    // Disabled elements swallow clicks instead of dispatching them.
    page.click("#b")?;
    assert!(page.has_class("#b", "is-loading")?);
    Ok(())
}

#[test]
fn previously_disabled_buttons_stay_disabled_after_the_request() -> Result<()> {
    let html = r#"
    <body>
      <form id="f" class="counter-action-form">
        <button id="b" type="submit" disabled>Start</button>
      </form>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;

    page.begin_request("#f")?;
    page.end_request("#f")?;
    assert!(page.attr("#b", "disabled")?.is_some());
    assert!(!page.has_class("#b", "is-loading")?);
    Ok(())
}

#[test]
fn forms_without_the_marker_class_are_untouched() -> Result<()> {
    let html = r#"
    <body>
      <form id="f"><button id="b">plain</button></form>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.begin_request("#f")?;
    assert!(!page.has_class("#b", "is-loading")?);
    assert!(page.attr("#b", "disabled")?.is_none());
    Ok(())
}

#[test]
fn ending_a_request_for_a_swapped_out_form_is_a_no_op() -> Result<()> {
    let html = r#"
    <body>
      <div id="panel">
        <form id="f" class="counter-action-form">
          <button id="b" type="submit">Start</button>
        </form>
      </div>
    </body>
    "#;
    let mut page = Page::from_html(html)?;
    page.load()?;
    page.begin_request("#f")?;
    page.swap_inner_html("#panel", "<p>done</p>")?;
    page.end_request("#f")?;
    page.assert_text("#panel", "done")?;
    Ok(())
}
