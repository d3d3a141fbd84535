use super::*;

#[test]
fn throttle_runs_after_its_delay() -> Result<()> {
    let mut page = Page::from_html(r#"<p id='msg'></p>"#)?;
    page.throttle("typing", 100, "document.getElementById('msg').textContent = 'fired';")?;
    assert_eq!(page.pending_timers(), 1);
    page.advance_time(99)?;
    page.assert_text("msg", "")?;
    page.advance_time(1)?;
    page.assert_text("msg", "fired")?;
    assert_eq!(page.pending_timers(), 0);
    Ok(())
}

#[test]
fn rearming_a_throttle_replaces_the_body_but_keeps_the_deadline() -> Result<()> {
    let mut page = Page::from_html(r#"<p id='msg'></p>"#)?;
    page.throttle("typing", 100, "document.getElementById('msg').textContent = 'first';")?;
    page.advance_time(60)?;
    // Re-arm inside the window: new body, original 100ms deadline.
    page.throttle("typing", 100, "document.getElementById('msg').textContent = 'second';")?;
    assert_eq!(page.pending_timers(), 1);
    page.advance_time(40)?;
    page.assert_text("msg", "second")?;
    Ok(())
}

#[test]
fn throttle_key_is_reusable_after_firing() -> Result<()> {
    let mut page = Page::from_html("<script>var runs = 0;</script>")?;
    page.throttle("k", 10, "runs = runs + 1;")?;
    page.advance_time(10)?;
    page.throttle("k", 10, "runs = runs + 1;")?;
    page.advance_time(10)?;
    assert_eq!(page.global_number("runs"), Some(2.0));
    Ok(())
}

#[test]
fn independent_throttle_keys_do_not_interfere() -> Result<()> {
    let mut page = Page::from_html("<script>var log = '';</script>")?;
    page.throttle("a", 10, "log = log + 'a';")?;
    page.throttle("b", 5, "log = log + 'b';")?;
    page.advance_time(10)?;
    assert_eq!(page.global_string("log").as_deref(), Some("ba"));
    Ok(())
}

#[test]
fn timers_fire_in_due_order_with_insertion_as_tiebreak() -> Result<()> {
    let mut page = Page::from_html("<script>var log = '';</script>")?;
    page.eval("setTimeout('log = log + \"1\";', 5);")?;
    page.eval("setTimeout('log = log + \"2\";', 5);")?;
    page.eval("setTimeout('log = log + \"0\";', 1);")?;
    page.advance_time(5)?;
    assert_eq!(page.global_string("log").as_deref(), Some("012"));
    Ok(())
}

#[test]
fn advance_time_to_runs_due_timers_up_to_the_target() -> Result<()> {
    let mut page = Page::from_html("<script>var log = '';</script>")?;
    page.eval("setTimeout('log = log + \"a\";', 7);")?;
    page.eval("setTimeout('log = log + \"b\";', 12);")?;
    page.advance_time_to(7)?;
    assert_eq!(page.global_string("log").as_deref(), Some("a"));
    page.advance_time_to(12)?;
    assert_eq!(page.global_string("log").as_deref(), Some("ab"));
    Ok(())
}

#[test]
fn advance_time_to_rejects_a_past_target() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.advance_time(10)?;
    let err = page.advance_time_to(5).unwrap_err();
    assert!(matches!(err, Error::ScriptRuntime(_)));
    Ok(())
}

#[test]
fn advance_time_rejects_negative_deltas() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    let err = page.advance_time(-1).unwrap_err();
    assert!(matches!(err, Error::ScriptRuntime(_)));
    Ok(())
}

#[test]
fn flush_runs_everything_regardless_of_due_time() -> Result<()> {
    let mut page = Page::from_html("<script>var log = '';</script>")?;
    page.eval("setTimeout('log = log + \"x\";', 1000);")?;
    page.flush_timers()?;
    assert_eq!(page.global_string("log").as_deref(), Some("x"));
    assert_eq!(page.pending_timers(), 0);
    Ok(())
}

#[test]
fn timer_step_limit_guards_runaway_queues() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.set_timer_step_limit(1)?;
    page.eval("setTimeout('window.a = 1;', 1);")?;
    page.eval("setTimeout('window.b = 2;', 2);")?;
    let err = page.flush_timers().unwrap_err();
    assert!(matches!(err, Error::ScriptRuntime(_)));
    Ok(())
}

#[test]
fn scheduled_script_parse_errors_surface_when_scheduled() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    let err = page.eval("setTimeout('var = broken', 1);").unwrap_err();
    assert!(matches!(err, Error::ScriptParse(_)));
    Ok(())
}
