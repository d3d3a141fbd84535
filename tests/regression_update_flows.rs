use ajax_tester::{Delivery, Page, Result};

const CHECKOUT_PAGE: &str = r#"
    <form id='checkout'>
        <input name='who' id='who' value=''>
        <input name='express' id='express' type='checkbox' value='yes'>
        <select name='size' id='size'>
            <option value='s'>small</option>
            <option value='m' selected>medium</option>
        </select>
    </form>
    <div id='summary'>no order yet</div>
    <div id='feedback' style='display: none'>saved</div>
    <script>var submissions = 0;</script>
"#;

#[test]
fn form_submission_patches_the_summary_and_reveals_feedback() -> Result<()> {
    let mut page = Page::from_html(CHECKOUT_PAGE)?;
    page.set_value("who", "Taro")?;
    page.set_checked("express", true)?;

    assert_eq!(
        page.serialize_form_body("checkout")?,
        "who=Taro&express=yes&size=m&"
    );

    page.mock_response(
        "/order?step=confirm",
        concat!(
            "<ajax-response>",
            "<component id=\"summary\"><![CDATA[<b>Taro</b>: medium, express]]></component>",
            "<evaluate>submissions = submissions + 1;",
            "document.getElementById('feedback').style.display = '';</evaluate>",
            "</ajax-response>",
        ),
    )?;

    page.submit_form("checkout", "/order?step=confirm", Some("place"))?;
    let delivery = page.deliver_next()?;
    let Some(Delivery::Processed(outcome)) = delivery else {
        panic!("expected a processed delivery, got {delivery:?}");
    };
    assert_eq!(outcome.applied, 2);

    page.assert_inner_html("summary", "<b>Taro</b>: medium, express")?;
    page.assert_text("summary", "Taro: medium, express")?;
    assert_eq!(page.global_number("submissions"), Some(1.0));
    page.eval("var visible = document.getElementById('feedback').style.display;")?;
    assert_eq!(page.global_string("visible").as_deref(), Some(""));
    Ok(())
}

#[test]
fn stale_overlapping_responses_apply_in_issue_order() -> Result<()> {
    let mut page = Page::from_html("<div id='results'></div>")?;
    page.mock_response(
        "/search?q=wi",
        r#"<ajax-response><component id="results">wi: 120 hits</component></ajax-response>"#,
    )?;
    page.mock_response(
        "/search?q=wicket",
        r#"<ajax-response><component id="results">wicket: 3 hits</component></ajax-response>"#,
    )?;

    // Two keystrokes, two in-flight requests; neither is cancelled.
    page.ajax_get("/search?q=wi")?;
    page.ajax_get("/search?q=wicket")?;
    assert_eq!(page.pending_requests(), 2);

    page.deliver_next()?;
    page.assert_text("results", "wi: 120 hits")?;
    page.deliver_next()?;
    page.assert_text("results", "wicket: 3 hits")?;
    Ok(())
}

#[test]
fn throttled_keystrokes_issue_one_request_for_the_last_value() -> Result<()> {
    let mut page = Page::from_html("<div id='results'></div>")?;
    page.mock_response(
        "/search?q=wicket",
        r#"<ajax-response><component id="results">wicket: 3 hits</component></ajax-response>"#,
    )?;

    // Each keystroke re-arms the same throttle key with a fresher request.
    for query in ["w", "wi", "wicket"] {
        page.throttle(
            "search-box",
            50,
            &format!("window.pendingQuery = '{query}';"),
        )?;
    }
    page.advance_time(50)?;
    assert_eq!(page.global_string("pendingQuery").as_deref(), Some("wicket"));

    page.ajax_get("/search?q=wicket")?;
    page.deliver_next()?;
    page.assert_text("results", "wicket: 3 hits")?;
    assert_eq!(page.ajax_calls().len(), 1);
    Ok(())
}

#[test]
fn a_failed_refresh_leaves_the_page_and_hooks_consistent() -> Result<()> {
    let mut page = Page::from_html(concat!(
        "<div id='ticker'>t0</div>",
        "<script>var failures = 0;</script>",
    ))?;
    page.set_error_handler(Some("failures = failures + 1;"));
    page.mock_response_with_status("/tick", 503, "service unavailable")?;

    page.ajax_get("/tick")?;
    assert_eq!(page.deliver_next()?, Some(Delivery::Dropped { status: 503 }));
    page.assert_text("ticker", "t0")?;
    assert_eq!(page.global_number("failures"), Some(1.0));

    // A later healthy refresh proceeds normally.
    page.mock_response(
        "/tick",
        r#"<ajax-response><component id="ticker">t1</component></ajax-response>"#,
    )?;
    page.ajax_get("/tick")?;
    page.deliver_next()?;
    page.assert_text("ticker", "t1")?;
    assert_eq!(page.global_number("failures"), Some(1.0));
    Ok(())
}
