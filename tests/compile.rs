use pretty_assertions::assert_eq;

use vns_compiler::ast::{BinaryOperator, ExpressionKind};
use vns_compiler::token::Kind;
use vns_compiler::translation::translation_key;
use vns_compiler::{compile, lex, parse, Artifact, Identifier, TranslationTable};

fn identifier() -> Identifier {
    Identifier::new("story/chapter1.vns", 0x5EED_1234)
}

fn listing(source: &str) -> Vec<String> {
    let script = compile(source, &identifier()).unwrap();
    Artifact::from_bytes(&script.binary).unwrap().listing().unwrap()
}

fn count(kinds: &[Kind], wanted: &Kind) -> usize {
    kinds.iter().filter(|kind| *kind == wanted).count()
}

#[test]
fn scopes_are_balanced() {
    let source = "\
;scene intro @who=narrator
    ;if @who == narrator
        Once upon a time.
        ;while @i < 3
            @i += 1
    ;else
        #alice Hi!
;call intro who=alice
";
    let kinds: Vec<Kind> = lex(source, &identifier())
        .unwrap()
        .into_iter()
        .map(|token| token.kind)
        .collect();
    assert_eq!(count(&kinds, &Kind::CreateScope), 4);
    assert_eq!(count(&kinds, &Kind::CreateScope), count(&kinds, &Kind::LeaveScope));
}

#[test]
fn open_blocks_are_closed_at_end_of_file() {
    let tokens = lex(";if @a\n    ;if @b\n        1", &identifier()).unwrap();
    let tail: Vec<&Kind> = tokens.iter().rev().take(2).map(|token| &token.kind).collect();
    assert_eq!(tail, vec![&Kind::LeaveScope, &Kind::LeaveScope]);
    assert!(compile(";if @a\n    ;if @b\n        1", &identifier()).is_ok());
}

#[test]
fn dedent_to_unknown_width_names_nearest_width() {
    let error = compile(";if @a\n    ;if @b\n        1\n      2\n", &identifier()).unwrap_err();
    assert_eq!(
        error.message,
        "indentation of 6 spaces does not match any enclosing block (nearest valid width is 4)"
    );
    assert_eq!(error.position.line, 3);
    assert_eq!(error.identifier, identifier());
}

#[test]
fn arithmetic_parse_shape_and_code() {
    let id = identifier();
    let ast = parse(lex("1 + 2 * 3\n", &id).unwrap(), &id).unwrap();
    let content = match ast.kind {
        ExpressionKind::Scope { content } => content,
        other => panic!("expected root scope, got {:?}", other),
    };
    assert_eq!(content.len(), 1);

    match &content[0].kind {
        ExpressionKind::Binary {
            operator: BinaryOperator::Add,
            left,
            right,
        } => {
            assert_eq!(left.kind, ExpressionKind::Integer { value: 1 });
            assert!(matches!(
                right.kind,
                ExpressionKind::Binary {
                    operator: BinaryOperator::Multiply,
                    ..
                }
            ));
        }
        other => panic!("expected addition, got {:?}", other),
    }

    assert_eq!(
        listing("1 + 2 * 3\n"),
        vec![
            "ScopeEnter",
            "PushInteger3",
            "PushInteger2",
            "Multiply",
            "PushInteger1",
            "Add",
            "ScopeLeave",
        ]
    );
}

#[test]
fn if_else_emission_shape() {
    assert_eq!(
        listing(";if @ready\n    [show]\n;elseif @late\n    3\n;else\n    4\n"),
        vec![
            "ScopeEnter",
            "LoadVariable \"ready\"",
            "ToBoolean",
            "BranchIfFalse L1",
            "ScopeEnter",
            "PushInteger0",
            "PushString \"show\"",
            "PluginCall",
            "ScopeLeave",
            "Branch L0",
            "L1:",
            "LoadVariable \"late\"",
            "ToBoolean",
            "BranchIfFalse L2",
            "ScopeEnter",
            "PushInteger3",
            "ScopeLeave",
            "Branch L0",
            "L2:",
            "ScopeEnter",
            "PushInteger4",
            "ScopeLeave",
            "L0:",
            "ScopeLeave",
        ]
    );
}

#[test]
fn repeated_negation_is_a_single_coercion() {
    let id = identifier();
    let ast = parse(lex("!!@flag\n!@flag\n", &id).unwrap(), &id).unwrap();
    let content = match ast.kind {
        ExpressionKind::Scope { content } => content,
        other => panic!("expected root scope, got {:?}", other),
    };
    assert!(matches!(content[0].kind, ExpressionKind::ToBoolean { .. }));
    assert!(matches!(content[1].kind, ExpressionKind::LogicNot { .. }));

    let code = listing("!!!@flag\n");
    assert_eq!(code.iter().filter(|line| *line == "ToBoolean").count(), 1);
    assert!(!code.iter().any(|line| line == "LogicNot"));
}

#[test]
fn plugin_calls_compile_independently() {
    let single = listing("[bgm track=theme loop]\n");
    let double = listing("[bgm track=theme loop]\n[bgm track=theme loop]\n");

    let body = &single[1..single.len() - 1];
    let mut expected = vec!["ScopeEnter".to_string()];
    expected.extend_from_slice(body);
    expected.push("Pop".to_string());
    expected.extend_from_slice(body);
    expected.push("ScopeLeave".to_string());
    assert_eq!(double, expected);
}

#[test]
fn immediate_opcodes_only_for_small_values() {
    let code = listing("0\n8\n9\n1.5\n1.3\n");
    assert_eq!(
        code,
        vec![
            "ScopeEnter",
            "PushInteger0",
            "Pop",
            "PushInteger8",
            "Pop",
            "PushInteger 9",
            "Pop",
            "PushFloat1_50",
            "Pop",
            "PushFloat 1.3",
            "ScopeLeave",
        ]
    );
}

#[test]
fn string_pool_is_deduplicated() {
    let script = compile("[sfx door]\n[sfx door]\n@door = sfx\n", &identifier()).unwrap();
    let artifact = Artifact::from_bytes(&script.binary).unwrap();
    assert_eq!(artifact.strings, vec!["door", "sfx"]);
}

#[test]
fn translation_keys_survive_unrelated_edits() {
    let original = compile("Hello there.\n#bob How are you?\n", &identifier()).unwrap();
    let edited = compile(
        "@mood = 1\nHello there.\n[wait time=2]\n#bob How are you?\n",
        &identifier(),
    )
    .unwrap();
    assert_eq!(original.translations, edited.translations);

    let reworded = compile("Hello there!\n#bob How are you?\n", &identifier()).unwrap();
    let keys: Vec<u32> = reworded.translations.entries.keys().copied().collect();
    assert_eq!(keys[1], translation_key(1, "How are you?"));
    assert_ne!(keys[0], translation_key(0, "Hello there."));
}

#[test]
fn translation_merge_keeps_translated_text() {
    let first = compile(";lang ja\nGood morning.\nGoodbye.\n", &identifier()).unwrap();
    let mut translated = first.translations.clone();
    for text in translated.entries.values_mut() {
        *text = format!("[ja] {}", text);
    }

    let second = compile(";lang ja\nGood morning.\nSee you.\n", &identifier()).unwrap();
    let report = translated.merge(&second.translations);
    assert_eq!((report.kept, report.added, report.removed), (1, 1, 1));

    let texts: Vec<&str> = translated.entries.values().map(String::as_str).collect();
    assert_eq!(texts, vec!["[ja] Good morning.", "See you."]);
    assert_eq!(translated.language, "ja");

    let packed = translated.pack();
    assert_eq!(TranslationTable::unpack(&packed).unwrap(), translated);
}

#[test]
fn artifact_round_trip_through_reader() {
    let id = identifier();
    let source = "\
;lang en
;scene greet @name
    #narrator Welcome!
    ;return @name
;call greet name=alice
@score = 2.5
";
    let script = compile(source, &id).unwrap();
    assert_eq!(&script.binary[..4], b"VNSB");

    let artifact = Artifact::from_bytes(&script.binary).unwrap();
    assert_eq!(artifact.hash, id.hash);
    assert_eq!(artifact.translations.entries, script.translations.entries);
    assert_eq!(script.translations.language, "en");
    assert!(artifact.labels.iter().all(|label| (label.offset as usize) <= artifact.code.len()));

    let instructions = artifact.instructions().unwrap();
    assert_eq!(instructions.first().map(|i| i.offset), Some(0));
    assert_eq!(artifact.position_at(0).map(|position| position.line), Some(0));

    let text = artifact.disassemble().unwrap();
    assert!(text.contains("FunctionCall"));
    assert!(text.contains("StoreVariable \"greet\""));
    assert!(text.contains("PushFloat2_50"));
}

#[test]
fn errors_carry_identifier_and_position() {
    let error = compile("@a = 'open\n", &identifier()).unwrap_err();
    assert_eq!(error.message, "unterminated string literal");
    assert_eq!(error.position.line, 0);
    assert_eq!(error.position.column, 5);
    assert!(error.to_string().ends_with("(at story/chapter1.vns[5EED1234]:0:5)"));

    let error = compile(";else\n    1\n", &identifier()).unwrap_err();
    assert_eq!(error.message, ";else without a matching ;if");
}
