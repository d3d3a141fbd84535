use super::*;

#[test]
fn window_prefix_and_bare_names_share_a_binding() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.eval("window.counter = 1; counter = counter + 2;")?;
    assert_eq!(page.global_number("counter"), Some(3.0));
    page.eval("var other = window.counter;")?;
    assert_eq!(page.global_number("other"), Some(3.0));
    Ok(())
}

#[test]
fn arithmetic_and_string_concatenation() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.eval("var n = 2 * 3 + 10 / 4;")?;
    assert_eq!(page.global_number("n"), Some(8.5));
    page.eval("var s = 'a' + 1 + true;")?;
    assert_eq!(page.global_string("s").as_deref(), Some("a1true"));
    Ok(())
}

#[test]
fn conditional_and_comparisons() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.eval("var pick = 3 > 2 ? 'yes' : 'no';")?;
    assert_eq!(page.global_string("pick").as_deref(), Some("yes"));
    page.eval("var strict = '1' === 1; var loose = '1' == 1;")?;
    assert_eq!(page.global_bool("strict"), Some(false));
    assert_eq!(page.global_bool("loose"), Some(true));
    Ok(())
}

#[test]
fn typeof_probes_missing_bindings() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.eval("var kind = typeof window.missing;")?;
    assert_eq!(page.global_string("kind").as_deref(), Some("undefined"));
    page.eval("window.present = 5; kind = typeof present;")?;
    assert_eq!(page.global_string("kind").as_deref(), Some("number"));
    Ok(())
}

#[test]
fn element_references_can_be_held_in_variables() -> Result<()> {
    let mut page = Page::from_html(r#"<input id='name' value='init'>"#)?;
    page.eval("var field = document.getElementById('name'); field.value = field.value + '!';")?;
    page.assert_value("name", "init!")?;
    Ok(())
}

#[test]
fn style_reads_and_writes_round_trip() -> Result<()> {
    let mut page = Page::from_html(r#"<div id='box' style='color: red'></div>"#)?;
    page.eval("document.getElementById('box').style.display = 'none';")?;
    page.eval("var shown = document.getElementById('box').style.display;")?;
    assert_eq!(page.global_string("shown").as_deref(), Some("none"));
    page.eval("var color = document.getElementById('box').style.color;")?;
    assert_eq!(page.global_string("color").as_deref(), Some("red"));
    Ok(())
}

#[test]
fn checked_and_disabled_are_booleans() -> Result<()> {
    let mut page = Page::from_html(r#"<input id='agree' type='checkbox'>"#)?;
    page.eval("document.getElementById('agree').checked = true;")?;
    page.assert_checked("agree", true)?;
    page.eval("var on = document.getElementById('agree').checked;")?;
    assert_eq!(page.global_bool("on"), Some(true));
    page.eval("document.getElementById('agree').disabled = true;")?;
    page.eval("var off = document.getElementById('agree').disabled;")?;
    assert_eq!(page.global_bool("off"), Some(true));
    Ok(())
}

#[test]
fn get_element_by_id_miss_is_a_runtime_error() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    let err = page
        .eval("document.getElementById('ghost').value = 'x';")
        .unwrap_err();
    assert!(matches!(err, Error::ScriptRuntime(_)));
    Ok(())
}

#[test]
fn alert_is_recorded_not_blocking() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.eval("alert('first'); alert('second ' + 2);")?;
    assert_eq!(page.alerts(), ["first".to_string(), "second 2".to_string()]);
    Ok(())
}

#[test]
fn regex_literals_test_inputs() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.eval(r"var hit = /^\d+$/.test('12345');")?;
    assert_eq!(page.global_bool("hit"), Some(true));
    page.eval(r"var miss = /^\d+$/.test('12a45');")?;
    assert_eq!(page.global_bool("miss"), Some(false));
    page.eval("var ci = /abc/i.test('xABCx');")?;
    assert_eq!(page.global_bool("ci"), Some(true));
    Ok(())
}

#[test]
fn string_methods_behave_like_the_host_language() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.eval("var s = '  Apache Wicket  ';")?;
    page.eval("var t = s.trim();")?;
    assert_eq!(page.global_string("t").as_deref(), Some("Apache Wicket"));
    page.eval("var up = t.toUpperCase(); var low = t.toLowerCase();")?;
    assert_eq!(page.global_string("up").as_deref(), Some("APACHE WICKET"));
    assert_eq!(page.global_string("low").as_deref(), Some("apache wicket"));
    page.eval("var idx = t.indexOf('Wicket');")?;
    assert_eq!(page.global_number("idx"), Some(7.0));
    page.eval("var missing = t.indexOf('zzz');")?;
    assert_eq!(page.global_number("missing"), Some(-1.0));
    page.eval("var cut = t.substring(0, 6);")?;
    assert_eq!(page.global_string("cut").as_deref(), Some("Apache"));
    page.eval("var ch = t.charAt(0);")?;
    assert_eq!(page.global_string("ch").as_deref(), Some("A"));
    page.eval("var len = t.length;")?;
    assert_eq!(page.global_number("len"), Some(13.0));
    Ok(())
}

#[test]
fn replace_substitutes_the_first_occurrence_only() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.eval("var out = 'a-b-c'.replace('-', '+');")?;
    assert_eq!(page.global_string("out").as_deref(), Some("a+b-c"));
    Ok(())
}

#[test]
fn while_loop_with_replace_drains_all_occurrences() -> Result<()> {
    // The idiom the original used to emulate replace-all.
    let mut page = Page::from_html("<div id='root'></div>")?;
    page.eval(concat!(
        "var str = ']^a]^b]^';",
        "while (str.indexOf(']^') > -1) { str = str.replace(']^', ']'); }",
    ))?;
    assert_eq!(page.global_string("str").as_deref(), Some("]a]b]"));
    Ok(())
}

#[test]
fn runaway_while_loop_is_cut_off() -> Result<()> {
    let mut page = Page::from_html("<div id='root'></div>")?;
    let err = page.eval("while (true) { var x = 1; }").unwrap_err();
    assert!(matches!(err, Error::ScriptRuntime(_)));
    Ok(())
}

#[test]
fn set_timeout_defers_until_time_advances() -> Result<()> {
    let mut page = Page::from_html(r#"<p id='msg'></p>"#)?;
    page.eval("setTimeout('document.getElementById(\\'msg\\').textContent = \\'late\\';', 50);")?;
    page.assert_text("msg", "")?;
    page.advance_time(49)?;
    page.assert_text("msg", "")?;
    page.advance_time(1)?;
    page.assert_text("msg", "late")?;
    Ok(())
}

#[test]
fn math_random_is_deterministic_with_seed() -> Result<()> {
    let mut a = Page::from_html("<div id='root'></div>")?;
    let mut b = Page::from_html("<div id='root'></div>")?;
    a.set_random_seed(7);
    b.set_random_seed(7);
    a.eval("var r = Math.random();")?;
    b.eval("var r = Math.random();")?;
    assert_eq!(a.global_number("r"), b.global_number("r"));
    Ok(())
}

#[test]
fn inline_page_scripts_run_once_at_construction() -> Result<()> {
    let page = Page::from_html(
        r#"
        <p id='msg'></p>
        <script>var booted = 'yes';</script>
        "#,
    )?;
    assert_eq!(page.global_string("booted").as_deref(), Some("yes"));
    Ok(())
}
