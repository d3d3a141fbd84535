use ajax_tester::{Envelope, Error, Instruction};
use proptest::prelude::*;

const ENVELOPE_PROPTEST_CASES: u32 = 256;

fn id_strategy() -> BoxedStrategy<String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}")
        .expect("valid id regex")
        .boxed()
}

fn payload_strategy() -> BoxedStrategy<String> {
    // Printable ASCII, markup characters included; escaping happens when the
    // envelope text is rendered.
    prop::string::string_regex("[ -~]{0,40}")
        .expect("valid payload regex")
        .boxed()
}

fn instruction_strategy() -> BoxedStrategy<Instruction> {
    prop_oneof![
        (id_strategy(), payload_strategy()).prop_map(|(id, markup)| Instruction::Component {
            id,
            markup,
        }),
        payload_strategy().prop_map(|script| Instruction::Evaluate { script }),
    ]
    .boxed()
}

fn escape_xml_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_envelope(instructions: &[Instruction]) -> String {
    let mut out = String::from("<ajax-response>");
    for instruction in instructions {
        match instruction {
            Instruction::Component { id, markup } => {
                out.push_str(&format!(
                    "<component id=\"{id}\">{}</component>",
                    escape_xml_text(markup)
                ));
            }
            Instruction::Evaluate { script } => {
                out.push_str(&format!(
                    "<evaluate>{}</evaluate>",
                    escape_xml_text(script)
                ));
            }
        }
    }
    out.push_str("</ajax-response>");
    out
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: ENVELOPE_PROPTEST_CASES,
        ..ProptestConfig::default()
    })]

    #[test]
    fn rendered_envelopes_parse_back_instruction_for_instruction(
        instructions in prop::collection::vec(instruction_strategy(), 0..8)
    ) {
        let text = render_envelope(&instructions);
        let envelope = Envelope::parse(&text).expect("rendered envelope parses");
        prop_assert_eq!(envelope.instructions, instructions);
    }

    #[test]
    fn any_other_root_name_is_malformed(
        root in prop::string::string_regex("[a-z][a-z-]{0,14}").expect("valid root regex"),
        instructions in prop::collection::vec(instruction_strategy(), 0..4)
    ) {
        prop_assume!(root != "ajax-response");
        let body = render_envelope(&instructions);
        let inner = body
            .strip_prefix("<ajax-response>")
            .and_then(|rest| rest.strip_suffix("</ajax-response>"))
            .expect("rendered envelope shape");
        let text = format!("<{root}>{inner}</{root}>");
        let err = Envelope::parse(&text).expect_err("misnamed root must fail");
        prop_assert!(matches!(err, Error::MalformedEnvelope(_)));
    }

    #[test]
    fn cdata_payloads_round_trip_markup(
        id in id_strategy(),
        payload in prop::string::string_regex("[ -~]{0,40}").expect("valid payload regex")
    ) {
        prop_assume!(!payload.contains("]]>"));
        let text = format!(
            "<ajax-response><component id=\"{id}\"><![CDATA[{payload}]]></component></ajax-response>"
        );
        let envelope = Envelope::parse(&text).expect("cdata envelope parses");
        prop_assert_eq!(
            envelope.instructions,
            vec![Instruction::Component { id, markup: payload }]
        );
    }

    #[test]
    fn surrounding_whitespace_and_comments_do_not_change_the_parse(
        instructions in prop::collection::vec(instruction_strategy(), 0..4)
    ) {
        let bare = render_envelope(&instructions);
        let decorated = format!(
            "<?xml version=\"1.0\"?>\n<!-- server reply -->\n{bare}\n<!-- end -->\n"
        );
        let a = Envelope::parse(&bare).expect("bare parses");
        let b = Envelope::parse(&decorated).expect("decorated parses");
        prop_assert_eq!(a, b);
    }
}
