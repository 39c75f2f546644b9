use std::sync::Arc;

use glam::Vec3;

use super::parser::tokenize;
use super::*;
use crate::error::ParseError;
use crate::resolver::{MemoryResolver, NullResolver};
use crate::timeline::Animation;

fn parse(text: &str) -> (AutoScript, Vec<ParseError>) {
    let resolver = NullResolver;
    let mut parser = GasParser::new(&resolver);
    let script = parser.parse("test", text);
    (script, parser.warnings().to_vec())
}

fn kinds(script: &AutoScript) -> Vec<&GasNodeKind> {
    script.nodes().iter().map(|n| &n.kind).collect()
}

#[test]
fn test_tokenize() {
    assert_eq!(tokenize("ANIM  idle01"), ["ANIM", "idle01"]);
    assert_eq!(tokenize("ONEOF a, b=2,c"), ["ONEOF", "a", "b=2", "c"]);
    assert_eq!(tokenize("WALKTO {1, 2, 3}"), ["WALKTO", "{1, 2, 3}"]);
    assert!(tokenize("   ").is_empty());
}

#[test]
fn test_parse_basic_script() {
    let mut resolver = MemoryResolver::new();
    resolver.insert_animation(Arc::new(Animation::new("gab_idle", 10)));

    let text = r#"
// 闲置循环
LABEL top
ANIM gab_idle
WAIT 2 5
SET a 3
DEC A
INC b 4
IF a >= 2 top
GOTO top
"#;
    let mut parser = GasParser::new(&resolver);
    let script = parser.parse("gab_idle", text);
    assert!(parser.warnings().is_empty(), "{:?}", parser.warnings());
    assert_eq!(script.node_count(), 8);
    assert_eq!(script.line_of(0), Some(3));
    assert_eq!(script.find_label("TOP"), Some(0));

    let GasNodeKind::Anim {
        name,
        animation,
        moving,
    } = &script.node(1).unwrap().kind
    else {
        panic!("期望 ANIM");
    };
    assert_eq!(name, "gab_idle");
    assert_eq!(animation.as_ref().unwrap().frame_count(), 10);
    assert!(!moving);

    let a = Variable::from_name("A").unwrap();
    let b = Variable::from_name("B").unwrap();
    assert_eq!(
        kinds(&script)[2..],
        [
            &GasNodeKind::Wait {
                min_seconds: 2.0,
                max_seconds: 5.0
            },
            &GasNodeKind::Set { var: a, value: 3 },
            &GasNodeKind::Add { var: a, delta: -1 },
            &GasNodeKind::Add { var: b, delta: 4 },
            &GasNodeKind::If {
                var: a,
                op: CompareOp::Ge,
                value: 2,
                label: "top".to_string()
            },
            &GasNodeKind::Goto {
                label: "top".to_string()
            },
        ]
    );
}

#[test]
fn test_chance_token() {
    let (script, warnings) = parse("ANIM wave random=25\nchance=0 USEIPOS chair\nWAIT 1 random=x\n");
    assert_eq!(script.node_count(), 2);
    assert_eq!(script.node(0).unwrap().chance, 25);
    assert_eq!(script.node(1).unwrap().chance, 0);
    assert_eq!(
        script.node(1).unwrap().kind,
        GasNodeKind::UseIPos {
            name: "chair".to_string()
        }
    );
    assert_eq!(warnings.len(), 1);
    assert!(matches!(&warnings[0], ParseError::InvalidField { field, line: 3, .. } if field == "random"));
}

#[test]
fn test_one_of_weights() {
    let (script, warnings) = parse("ONEOF scratch=3, yawn stretch=0\nONEOF a=x\n");
    assert_eq!(warnings.len(), 1);
    let GasNodeKind::OneOf { options } = &script.node(0).unwrap().kind else {
        panic!("期望 ONEOF");
    };
    let weights: Vec<(&str, u32)> = options.iter().map(|o| (o.name.as_str(), o.weight)).collect();
    assert_eq!(weights, [("scratch", 3), ("yawn", 1), ("stretch", 0)]);
    assert!(options.iter().all(|o| o.animation.is_none()));
}

#[test]
fn test_wait_bounds() {
    let (script, warnings) = parse("WAIT 3\nWAIT 5 1\nWAIT -1\n");
    assert_eq!(
        kinds(&script),
        [
            &GasNodeKind::Wait {
                min_seconds: 3.0,
                max_seconds: 3.0
            },
            &GasNodeKind::Wait {
                min_seconds: 1.0,
                max_seconds: 5.0
            },
        ]
    );
    assert_eq!(warnings.len(), 2);
    assert!(matches!(&warnings[0], ParseError::InvalidField { field, line: 2, .. } if field == "max"));
    assert!(matches!(&warnings[1], ParseError::InvalidField { field, line: 3, .. } if field == "seconds"));
}

#[test]
fn test_goto_forms() {
    let (script, warnings) = parse("GOTO\nLOOP\ngoto Start\n");
    assert!(warnings.is_empty());
    assert_eq!(
        kinds(&script),
        [
            &GasNodeKind::Goto {
                label: String::new()
            },
            &GasNodeKind::Goto {
                label: String::new()
            },
            &GasNodeKind::Goto {
                label: "Start".to_string()
            },
        ]
    );
}

#[test]
fn test_walk_targets() {
    let (script, warnings) = parse("WALKTO door\nWALKTO {1, 2, 3}\nCHOOSEWALK bed=2, {0,0,5}, window=1\n");
    assert!(warnings.is_empty(), "{warnings:?}");
    assert_eq!(
        script.node(0).unwrap().kind,
        GasNodeKind::WalkTo {
            target: WalkTarget::Named("door".to_string())
        }
    );
    assert_eq!(
        script.node(1).unwrap().kind,
        GasNodeKind::WalkTo {
            target: WalkTarget::Position(Vec3::new(1.0, 2.0, 3.0))
        }
    );
    let GasNodeKind::ChooseWalk { targets } = &script.node(2).unwrap().kind else {
        panic!("期望 CHOOSEWALK");
    };
    assert_eq!(
        targets,
        &[
            WalkOption {
                target: WalkTarget::Named("bed".to_string()),
                weight: 2
            },
            WalkOption {
                target: WalkTarget::Position(Vec3::new(0.0, 0.0, 5.0)),
                weight: 1
            },
            WalkOption {
                target: WalkTarget::Named("window".to_string()),
                weight: 1
            },
        ]
    );
}

#[test]
fn test_anim_moving_flag() {
    let (script, _) = parse("ANIM walk_loop moving\n");
    assert!(matches!(
        &script.node(0).unwrap().kind,
        GasNodeKind::Anim { moving: true, .. }
    ));
}

#[test]
fn test_malformed_lines() {
    let text = "\
DANCE wildly
SET 1 2
SET a two
IF a ?? 2 top
IF a = 2
LABEL
WALKTO {1, 2}
";
    let (script, warnings) = parse(text);
    assert_eq!(script.node_count(), 0);
    assert_eq!(warnings.len(), 7);
    assert!(matches!(&warnings[0], ParseError::UnknownKeyword { keyword, line: 1, .. } if keyword == "DANCE"));
    assert!(matches!(&warnings[1], ParseError::InvalidField { field, .. } if field == "var"));
    assert!(matches!(&warnings[2], ParseError::InvalidField { field, .. } if field == "value"));
    assert!(matches!(&warnings[3], ParseError::InvalidField { field, .. } if field == "op"));
    assert!(matches!(&warnings[4], ParseError::FieldCount { found: 3, .. }));
    assert!(matches!(&warnings[5], ParseError::FieldCount { found: 0, .. }));
    assert!(matches!(&warnings[6], ParseError::InvalidField { field, .. } if field == "target"));
}
