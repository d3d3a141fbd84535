use super::*;

fn traced_page(html: &str) -> Result<Page> {
    let mut page = Page::from_html(html)?;
    page.enable_trace(true);
    page.set_trace_stderr(false);
    Ok(page)
}

#[test]
fn request_issue_and_delivery_are_traced() -> Result<()> {
    let mut page = traced_page(r#"<p id='msg'></p>"#)?;
    page.mock_response(
        "/u",
        r#"<ajax-response><component id="msg">hi</component></ajax-response>"#,
    )?;
    page.ajax_get("/u")?;
    page.deliver_next()?;
    let logs = page.take_trace_logs();
    assert!(logs.iter().any(|line| line.contains("[ajax] GET url=/u&random=")));
    assert!(logs.iter().any(|line| line.contains("[ajax] received")));
    assert!(logs
        .iter()
        .any(|line| line.contains("[ajax] component id=msg replaced")));
    assert!(logs
        .iter()
        .any(|line| line.contains("[ajax] envelope processed applied=1 skipped=0")));
    Ok(())
}

#[test]
fn skipped_targets_are_traced() -> Result<()> {
    let mut page = traced_page("<div id='root'></div>")?;
    page.process_response(
        r#"<ajax-response><component id="ghost">x</component></ajax-response>"#,
    )?;
    let logs = page.take_trace_logs();
    assert!(logs
        .iter()
        .any(|line| line.contains("[ajax] component id=ghost target not found, skipped")));
    Ok(())
}

#[test]
fn timer_activity_is_traced() -> Result<()> {
    let mut page = traced_page("<div id='root'></div>")?;
    page.eval("setTimeout('window.x = 1;', 5);")?;
    page.advance_time(5)?;
    let logs = page.take_trace_logs();
    assert!(logs.iter().any(|line| line.contains("[timer] set id=1 delay_ms=5")));
    assert!(logs.iter().any(|line| line.contains("[timer] run id=1")));
    assert!(logs
        .iter()
        .any(|line| line.contains("[timer] advance delta_ms=5 from=0 to=5 ran_due=1")));
    Ok(())
}

#[test]
fn trace_areas_can_be_silenced_independently() -> Result<()> {
    let mut page = traced_page(r#"<p id='msg'></p>"#)?;
    page.set_trace_ajax(false);
    page.process_response(
        r#"<ajax-response><component id="msg">hi</component></ajax-response>"#,
    )?;
    page.eval("setTimeout('window.x = 1;', 1);")?;
    page.advance_time(1)?;
    let logs = page.take_trace_logs();
    assert!(logs.iter().all(|line| !line.starts_with("[ajax]")));
    assert!(logs.iter().any(|line| line.starts_with("[timer]")));
    Ok(())
}

#[test]
fn disabled_trace_records_nothing() -> Result<()> {
    let mut page = Page::from_html(r#"<p id='msg'></p>"#)?;
    page.set_trace_stderr(false);
    page.process_response(
        r#"<ajax-response><component id="msg">hi</component></ajax-response>"#,
    )?;
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_log_limit_keeps_the_most_recent_lines() -> Result<()> {
    let mut page = traced_page("<div id='root'></div>")?;
    page.set_trace_log_limit(2)?;
    page.process_response("<ajax-response/>")?;
    page.process_response("<ajax-response/>")?;
    page.process_response("<ajax-response/>")?;
    let logs = page.take_trace_logs();
    assert_eq!(logs.len(), 2);
    Ok(())
}

#[test]
fn take_trace_logs_drains_the_buffer() -> Result<()> {
    let mut page = traced_page("<div id='root'></div>")?;
    page.process_response("<ajax-response/>")?;
    assert!(!page.take_trace_logs().is_empty());
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn zero_log_limit_is_rejected() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    let err = page.set_trace_log_limit(0).unwrap_err();
    assert!(matches!(err, Error::ScriptRuntime(_)));
    Ok(())
}
