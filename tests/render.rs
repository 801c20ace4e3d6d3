use gotmpl::{Template, Value};

fn render(source: &str, ctx: Value) -> gotmpl::Result<String> {
    Template::compile(source)?.render_from(ctx)
}

fn map<const N: usize>(entries: [(&str, Value); N]) -> Value {
    Value::from(entries)
}

#[test]
fn render_plain_text() {
    assert_eq!(render("Hello, World!", Value::None).unwrap(), "Hello, World!");
}

#[test]
fn render_empty_template() {
    assert_eq!(render("", Value::None).unwrap(), "");
}

#[test]
fn render_string_literal() {
    assert_eq!(
        render("{{ \"Hello, World!\" }}", Value::None).unwrap(),
        "Hello, World!"
    );
}

#[test]
fn render_number_literal() {
    assert_eq!(render("{{ 42 }}", Value::None).unwrap(), "42");
}

#[test]
fn render_float_literal() {
    assert_eq!(render("{{ 3.14 }}", Value::None).unwrap(), "3.14");
}

#[test]
fn render_bool_literal() {
    assert_eq!(render("{{ true }}", Value::None).unwrap(), "true");
}

#[test]
fn render_nil_literal() {
    assert_eq!(render("{{ nil }}", Value::None).unwrap(), "");
}

#[test]
fn render_raw_string_literal() {
    assert_eq!(render("{{ `raw` }}", Value::None).unwrap(), "raw");
}

#[test]
fn render_dot_list() {
    assert_eq!(render("{{ . }}", Value::from([1, 2, 3])).unwrap(), "1 2 3");
}

#[test]
fn render_dot_map() {
    let ctx = map([("Name", Value::from("Alice"))]);
    assert_eq!(render("{{ . }}", ctx).unwrap(), "Name:Alice");
}

#[test]
fn render_dot_nested_map() {
    let users = Value::from(vec![
        map([("Name", Value::from("Bob"))]),
        map([("Name", Value::from("Charlie"))]),
    ]);
    let ctx = map([("Users", users)]);
    assert_eq!(render("{{ . }}", ctx).unwrap(), "Users:Name:Bob Name:Charlie");
}

#[test]
fn render_comment_only_action() {
    assert_eq!(render("X {{ /* note */ }} Y", Value::None).unwrap(), "X  Y");
}

#[test]
fn render_trim_markers() {
    assert_eq!(render(" A {{- 42 -}} B", Value::None).unwrap(), " A42B");
}

#[test]
fn render_unknown_identifier_evaluates_to_its_name() {
    assert_eq!(render("Hello {{ name }}!", Value::None).unwrap(), "Hello name!");
}

#[test]
fn render_field() {
    let ctx = map([("Name", Value::from("Alice"))]);
    assert_eq!(render("{{ .Name }}", ctx).unwrap(), "Alice");
}

#[test]
fn render_field_chain() {
    let ctx = map([("User", map([("Name", Value::from("Bob"))]))]);
    assert_eq!(render("{{ .User.Name }}", ctx).unwrap(), "Bob");
}

#[test]
fn render_missing_field_is_nil() {
    assert_eq!(render("{{ .Missing }}", Value::None).unwrap(), "");
}

#[test]
fn render_field_on_non_map_is_nil() {
    let ctx = map([("Name", Value::from("Alice"))]);
    assert_eq!(render("{{ .Name.Inner }}", ctx).unwrap(), "");
}

#[test]
fn render_if_true() {
    let ctx = map([("Show", Value::from(true))]);
    assert_eq!(render("{{ if .Show }}Yes{{ end }}", ctx).unwrap(), "Yes");
}

#[test]
fn render_if_false() {
    let ctx = map([("Show", Value::from(false))]);
    assert_eq!(render("{{ if .Show }}Yes{{ end }}", ctx).unwrap(), "");
}

#[test]
fn render_if_else() {
    let template = "{{ if .Show }}Yes{{ else }}No{{ end }}";
    let truthy = map([("Show", Value::from(true))]);
    let falsy = map([("Show", Value::from(false))]);
    assert_eq!(render(template, truthy).unwrap(), "Yes");
    assert_eq!(render(template, falsy).unwrap(), "No");
}

#[test]
fn render_if_else_if() {
    let template = "{{ if .Show1 }}First{{ else if .Show2 }}Second{{ end }}";
    let first = map([("Show1", Value::from(true)), ("Show2", Value::from(false))]);
    let second = map([("Show1", Value::from(false)), ("Show2", Value::from(true))]);
    let neither = map([("Show1", Value::from(false)), ("Show2", Value::from(false))]);
    assert_eq!(render(template, first).unwrap(), "First");
    assert_eq!(render(template, second).unwrap(), "Second");
    assert_eq!(render(template, neither).unwrap(), "");
}

#[test]
fn render_if_else_if_else() {
    let template = "{{ if .Show1 }}First{{ else if .Show2 }}Second{{ else }}Third{{ end }}";
    let neither = map([("Show1", Value::from(false)), ("Show2", Value::from(false))]);
    assert_eq!(render(template, neither).unwrap(), "Third");
}

#[test]
fn render_actions_inside_branches() {
    let template = "{{ if .Show }}{{ \"Yes\" }}{{ else }}{{ \"No\" }}{{ end }}";
    assert_eq!(render(template, map([("Show", Value::from(true))])).unwrap(), "Yes");
    assert_eq!(render(template, map([("Show", Value::from(false))])).unwrap(), "No");
}

#[test]
fn render_nested_if() {
    let template = "{{ if .Outer }}{{ if .Inner }}Yes{{ else }}No{{ end }}{{ end }}";
    let both = map([("Outer", Value::from(true)), ("Inner", Value::from(true))]);
    let outer = map([("Outer", Value::from(true)), ("Inner", Value::from(false))]);
    let inner = map([("Outer", Value::from(false)), ("Inner", Value::from(true))]);
    assert_eq!(render(template, both).unwrap(), "Yes");
    assert_eq!(render(template, outer).unwrap(), "No");
    assert_eq!(render(template, inner).unwrap(), "");
}

#[test]
fn render_deeply_nested_if() {
    let template = "{{ if .A }}{{ if .B }}{{ if .C }}ABC{{ else }}AB-elseC{{ end }}{{ else }}A-elseB{{ end }}{{ else }}elseA{{ end }}";
    let ctx = |a: bool, b: bool, c: bool| {
        map([
            ("A", Value::from(a)),
            ("B", Value::from(b)),
            ("C", Value::from(c)),
        ])
    };
    assert_eq!(render(template, ctx(true, true, true)).unwrap(), "ABC");
    assert_eq!(render(template, ctx(true, true, false)).unwrap(), "AB-elseC");
    assert_eq!(render(template, ctx(true, false, true)).unwrap(), "A-elseB");
    assert_eq!(render(template, ctx(false, true, true)).unwrap(), "elseA");
}

#[test]
fn render_nested_if_inside_else() {
    let template = "{{ if .Outer }}OUTER{{ else }}{{ if .Inner }}INNER{{ else }}NONE{{ end }}{{ end }}";
    let ctx = |outer: bool, inner: bool| {
        map([("Outer", Value::from(outer)), ("Inner", Value::from(inner))])
    };
    assert_eq!(render(template, ctx(true, true)).unwrap(), "OUTER");
    assert_eq!(render(template, ctx(false, true)).unwrap(), "INNER");
    assert_eq!(render(template, ctx(false, false)).unwrap(), "NONE");
}

#[test]
fn render_else_if_chain() {
    let template =
        "{{ if .Outer }}OUTER{{ else if .Mid }}MID{{ else if .Inner }}INNER{{ else }}NONE{{ end }}";
    let ctx = |outer: bool, mid: bool, inner: bool| {
        map([
            ("Outer", Value::from(outer)),
            ("Mid", Value::from(mid)),
            ("Inner", Value::from(inner)),
        ])
    };
    assert_eq!(render(template, ctx(true, true, true)).unwrap(), "OUTER");
    assert_eq!(render(template, ctx(false, true, true)).unwrap(), "MID");
    assert_eq!(render(template, ctx(false, false, true)).unwrap(), "INNER");
    assert_eq!(render(template, ctx(false, false, false)).unwrap(), "NONE");
}

#[test]
fn render_with_rebinds_dot() {
    let ctx = map([("User", map([("Name", Value::from("Charlie"))]))]);
    assert_eq!(
        render("{{ with .User }}{{ .Name }}{{ end }}", ctx).unwrap(),
        "Charlie"
    );
}

#[test]
fn render_with_else_when_falsy() {
    assert_eq!(
        render("{{ with .User }}{{ .Name }}{{ else }}No User{{ end }}", Value::None).unwrap(),
        "No User"
    );
}

#[test]
fn render_dollar_refers_to_root_context() {
    let ctx = map([
        ("User", map([("Name", Value::from("Ann"))])),
        ("Title", Value::from("Dr")),
    ]);
    assert_eq!(
        render("{{ with .User }}{{ $.Title }} {{ .Name }}{{ end }}", ctx).unwrap(),
        "Dr Ann"
    );
}

#[test]
fn render_dollar_inside_range() {
    let ctx = map([
        ("Items", Value::from(["a", "b"])),
        ("Sep", Value::from("|")),
    ]);
    assert_eq!(
        render("{{ range .Items }}{{ . }}{{ $.Sep }}{{ end }}", ctx).unwrap(),
        "a|b|"
    );
}

#[test]
fn render_range_list() {
    let ctx = map([("Items", Value::from(["a", "b", "c"]))]);
    assert_eq!(
        render("{{ range .Items }}{{ . }}-{{ end }}", ctx).unwrap(),
        "a-b-c-"
    );
}

#[test]
fn render_range_empty_list() {
    let ctx = map([("Items", Value::List(Vec::new()))]);
    assert_eq!(render("{{ range .Items }}{{ . }}-{{ end }}", ctx).unwrap(), "");
}

#[test]
fn render_range_empty_list_else() {
    let ctx = map([("Items", Value::List(Vec::new()))]);
    assert_eq!(
        render("{{ range .Items }}{{ . }}{{ else }}EMPTY{{ end }}", ctx).unwrap(),
        "EMPTY"
    );
}

#[test]
fn render_range_map_values() {
    let ctx = map([("Obj", map([("a", Value::from("A")), ("b", Value::from("B"))]))]);
    assert_eq!(render("{{ range .Obj }}{{ . }}-{{ end }}", ctx).unwrap(), "A-B-");
}

#[test]
fn render_range_map_exposes_key() {
    let ctx = map([("Obj", map([("x", Value::from(1)), ("y", Value::from(2))]))]);
    assert_eq!(
        render("{{ range .Obj }}{{ $key }}={{ . }},{{ end }}", ctx).unwrap(),
        "x=1,y=2,"
    );
}

#[test]
fn render_range_empty_map_else() {
    let ctx = map([("Obj", Value::Map(Default::default()))]);
    assert_eq!(
        render("{{ range .Obj }}{{ . }}{{ else }}NONE{{ end }}", ctx).unwrap(),
        "NONE"
    );
}

#[test]
fn render_range_non_iterable_renders_else() {
    let ctx = map([("Obj", Value::from(42))]);
    assert_eq!(
        render("{{ range .Obj }}x{{ else }}NONE{{ end }}", ctx).unwrap(),
        "NONE"
    );
    assert_eq!(render("{{ range .Obj }}x{{ end }}", map([])).unwrap(), "");
}

#[test]
fn render_range_single_declaration() {
    let ctx = map([("Items", Value::from(["x", "y"]))]);
    assert_eq!(
        render("{{ range $v := .Items }}{{ $v }};{{ end }}", ctx).unwrap(),
        "x;y;"
    );
}

#[test]
fn render_range_two_declarations() {
    let ctx = map([("Items", Value::from(["x", "y", "z"]))]);
    assert_eq!(
        render("{{ range $i, $v := .Items }}{{ $i }}={{ $v }},{{ end }}", ctx).unwrap(),
        "0=x,1=y,2=z,"
    );
}

#[test]
fn render_range_map_single_declaration() {
    let ctx = map([("Obj", map([("a", Value::from("A")), ("b", Value::from("B"))]))]);
    assert_eq!(
        render("{{ range $v := .Obj }}{{ $v }},{{ end }}", ctx).unwrap(),
        "A,B,"
    );
}

#[test]
fn render_range_map_two_declarations() {
    let ctx = map([("Obj", map([("a", Value::from(1)), ("b", Value::from(2))]))]);
    assert_eq!(
        render("{{ range $k, $v := .Obj }}{{ $k }}={{ $v }},{{ end }}", ctx).unwrap(),
        "a=1,b=2,"
    );
}

#[test]
fn render_range_exposes_index() {
    let ctx = map([("Items", Value::from(["a", "b"]))]);
    assert_eq!(
        render("{{ range .Items }}{{ $index }}:{{ . }} {{ end }}", ctx).unwrap(),
        "0:a 1:b "
    );
}

#[test]
fn render_variable_declaration_and_use() {
    assert_eq!(
        render("{{ $greeting := \"Hello\" }}{{ $greeting }}", Value::None).unwrap(),
        "Hello"
    );
    assert_eq!(render("{{ $num := 42 }}{{ $num }}", Value::None).unwrap(), "42");
}

#[test]
fn render_declaration_produces_no_output() {
    assert_eq!(render("A{{ $x := 1 }}B", Value::None).unwrap(), "AB");
}

#[test]
fn scope_variable_does_not_leak_from_if() {
    let template = "{{ $x := \"root\" }}{{ if .Cond }}{{ $x := \"inner\" }}{{ end }}{{ $x }}";
    for cond in [true, false] {
        let ctx = map([("Cond", Value::from(cond))]);
        assert_eq!(render(template, ctx).unwrap(), "root", "Cond = {cond}");
    }
}

#[test]
fn scope_variable_does_not_leak_from_else() {
    let template = "{{ $x := \"root\" }}{{ if .Cond }}OK{{ else }}{{ $x := \"else\" }}{{ end }}{{ $x }}";
    let ctx = map([("Cond", Value::from(false))]);
    assert_eq!(render(template, ctx).unwrap(), "root");
}

#[test]
fn scope_nested_redeclaration_does_not_override_outer() {
    let template =
        "{{ $a := \"root\" }}{{ if .Outer }}{{ if .Inner }}{{ $a := \"X\" }}{{ end }}{{ end }}{{ $a }}";
    let ctx = map([("Outer", Value::from(true)), ("Inner", Value::from(true))]);
    assert_eq!(render(template, ctx).unwrap(), "root");
}

#[test]
fn scope_inner_declaration_shadows_within_branch() {
    let template = "{{ $v := \"root\" }}{{ if .A }}{{ $v := \"A1\" }}{{ $v }}{{ end }}";
    let ctx = map([("A", Value::from(true))]);
    assert_eq!(render(template, ctx).unwrap(), "A1");
}

#[test]
fn scope_inner_declaration_shadows_in_else() {
    let template = "{{ $v := \"root\" }}{{ if .A }}OK{{ else }}{{ $v := \"B1\" }}{{ $v }}{{ end }}";
    let ctx = map([("A", Value::from(false))]);
    assert_eq!(render(template, ctx).unwrap(), "B1");
}

#[test]
fn scope_inner_declaration_shadows_in_else_if() {
    let template =
        "{{ $v := \"root\" }}{{ if .A }}OK{{ else if .B }}{{ $v := \"C1\" }}{{ $v }}{{ end }}";
    let ctx = map([("A", Value::from(false)), ("B", Value::from(true))]);
    assert_eq!(render(template, ctx).unwrap(), "C1");
}

#[test]
fn scope_outer_variable_unchanged_after_branch() {
    let template = "{{ $v := \"root\" }}{{ if .A }}{{ $v := \"A1\" }}{{ end }}OUTER:{{ $v }}";
    let ctx = map([("A", Value::from(true))]);
    assert_eq!(render(template, ctx).unwrap(), "OUTER:root");
}

#[test]
fn scope_isolated_across_all_branch_shapes() {
    let template = "{{ $v := \"root\" }}{{ if .A }}{{ $v := \"A1\" }}{{ else if .B }}{{ $v := \"B1\" }}{{ else }}{{ $v := \"C1\" }}{{ end }}{{ $v }}";
    let cases = [(true, true), (false, true), (false, false)];
    for (a, b) in cases {
        let ctx = map([("A", Value::from(a)), ("B", Value::from(b))]);
        assert_eq!(render(template, ctx).unwrap(), "root", "A = {a}, B = {b}");
    }
}

#[test]
fn render_builtin_len() {
    let ctx = map([("Items", Value::from([1, 2, 3, 4]))]);
    assert_eq!(render("{{ len .Items }}", ctx).unwrap(), "4");
    let ctx = map([("Text", Value::from("Hello"))]);
    assert_eq!(render("{{ len .Text }}", ctx).unwrap(), "5");
}

#[test]
fn render_builtin_comparisons() {
    let ctx = map([("Value1", Value::from(42)), ("Value2", Value::from(42))]);
    assert_eq!(render("{{ eq .Value1 .Value2 }}", ctx).unwrap(), "true");
    let ctx = map([("Value1", Value::from(42)), ("Value2", Value::from(43))]);
    assert_eq!(render("{{ ne .Value1 .Value2 }}", ctx).unwrap(), "true");
    let ctx = map([("Value1", Value::from(41)), ("Value2", Value::from(42))]);
    assert_eq!(render("{{ lt .Value1 .Value2 }}", ctx).unwrap(), "true");
    let ctx = map([("Value1", Value::from(43)), ("Value2", Value::from(42))]);
    assert_eq!(render("{{ gt .Value1 .Value2 }}", ctx).unwrap(), "true");
}

#[test]
fn render_builtin_logic() {
    let ctx = map([("Cond1", Value::from(true)), ("Cond2", Value::from(true))]);
    assert_eq!(render("{{ and .Cond1 .Cond2 }}", ctx).unwrap(), "true");
    let ctx = map([("Cond1", Value::from(false)), ("Cond2", Value::from(true))]);
    assert_eq!(render("{{ or .Cond1 .Cond2 }}", ctx).unwrap(), "true");
    assert_eq!(render("{{ not .Missing }}", Value::None).unwrap(), "true");
}

#[test]
fn render_builtin_index() {
    let ctx = map([("Arr", Value::from(["a", "b", "c"]))]);
    assert_eq!(render("{{ index .Arr 1 }}", ctx).unwrap(), "b");
    let ctx = map([("Obj", map([("key", Value::from("value"))]))]);
    assert_eq!(render("{{ index .Obj \"key\" }}", ctx).unwrap(), "value");
}

#[test]
fn render_builtin_in_condition() {
    let ctx = map([("Items", Value::from([1, 2, 3]))]);
    assert_eq!(
        render("{{ if eq (len .Items) 3 }}three{{ end }}", ctx).is_err(),
        true,
        "parenthesized grouping is not part of the grammar"
    );
    let ctx = map([("A", Value::from(1)), ("B", Value::from(1))]);
    assert_eq!(
        render("{{ if eq .A .B }}same{{ end }}", ctx).unwrap(),
        "same"
    );
}

#[test]
fn render_pipeline_chains_previous_value() {
    let ctx = map([("Name", Value::from("World"))]);
    assert_eq!(
        render("{{ .Name | printf \"Hello, %s!\" }}", ctx).unwrap(),
        "Hello, World!"
    );
}

#[test]
fn render_pipeline_chain_through_multiple_commands() {
    let ctx = map([("Items", Value::from(["a", "b"]))]);
    assert_eq!(render("{{ .Items | len }}", ctx).unwrap(), "2");
    assert_eq!(
        render("{{ \"x\" | print \"y\" }}", Value::None).unwrap(),
        "yx"
    );
}

#[test]
fn render_declaration_from_pipe_value() {
    let ctx = map([("Items", Value::from(["a", "b"]))]);
    assert_eq!(
        render("{{ $n := len .Items }}{{ $n }}", ctx).unwrap(),
        "2"
    );
}

#[test]
fn render_call_builtin_with_function_value() {
    let shout = Value::from_fn(|args| {
        let mut out = String::new();
        for arg in args {
            out.push_str(&arg.to_string().to_uppercase());
        }
        Ok(Value::from(out))
    });
    let ctx = map([("Shout", shout)]);
    assert_eq!(render("{{ call .Shout \"hey\" }}", ctx).unwrap(), "HEY");
}

#[test]
fn render_define_and_template_invocation() {
    let ctx = map([("User", map([("Name", Value::from("Alice"))]))]);
    assert_eq!(
        render(
            "{{ define \"greet\" }}Hi {{ .Name }}!{{ end }}{{ template \"greet\" .User }}",
            ctx
        )
        .unwrap(),
        "Hi Alice!"
    );
}

#[test]
fn render_define_compact_syntax() {
    let ctx = map([("Name", Value::from("Ada"))]);
    assert_eq!(
        render("{{define \"x\"}}Hi {{.Name}}{{end}}{{template \"x\" .}}", ctx).unwrap(),
        "Hi Ada"
    );
}

#[test]
fn render_block_fallback() {
    let ctx = map([("User", map([("Name", Value::from("Bob"))]))]);
    assert_eq!(
        render("{{ block \"greet\" .User }}Hi {{ .Name }}!{{ end }}", ctx).unwrap(),
        "Hi Bob!"
    );
}

#[test]
fn render_block_overridden_by_define() {
    let template =
        "{{ define \"greet\" }}Override{{ end }}{{ block \"greet\" .User }}Hi {{ .Name }}!{{ end }}";
    let ctx = map([("User", map([("Name", Value::from("Carol"))]))]);
    assert_eq!(render(template, ctx).unwrap(), "Override");
}

#[test]
fn render_block_inline_fallback_between_text() {
    assert_eq!(
        render("A{{block \"section\" .}}<default>{{end}}B", Value::None).unwrap(),
        "A<default>B"
    );
    assert_eq!(
        render(
            "{{define \"section\"}}<override>{{end}}A{{block \"section\" .}}<default>{{end}}B",
            Value::None
        )
        .unwrap(),
        "A<override>B"
    );
}

#[test]
fn render_template_missing_errors() {
    let err = render("{{ template \"missing\" . }}", Value::None).unwrap_err();
    assert_eq!(err.to_string(), "template: no such template \"missing\"");

    let err = render("Before {{template \"missing\" .}} After", Value::None).unwrap_err();
    assert_eq!(err.to_string(), "template: no such template \"missing\"");
}

#[test]
fn render_template_pipeline_sets_dot() {
    let ctx = map([("User", map([("Name", Value::from("Zed"))]))]);
    assert_eq!(
        render(
            "{{ define \"inner\" }}Name={{ .Name }}{{ end }}{{ template \"inner\" .User }}",
            ctx
        )
        .unwrap(),
        "Name=Zed"
    );
    assert_eq!(
        render(
            "{{define \"inner\"}}{{.}}{{end}}{{template \"inner\" \"Hello\"}}",
            Value::None
        )
        .unwrap(),
        "Hello"
    );
}

#[test]
fn render_template_without_pipe_inherits_dot() {
    let ctx = map([("Name", Value::from("Eve"))]);
    assert_eq!(
        render("{{ define \"x\" }}{{ .Name }}{{ end }}{{ template \"x\" }}", ctx).unwrap(),
        "Eve"
    );
}

#[test]
fn render_duplicate_define_errors_before_output() {
    let err = render(
        "{{define \"dup\"}}a{{end}}{{define \"dup\"}}b{{end}}",
        Value::None,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "template: duplicate define for dup");

    // The duplicate is detected before any sibling output is produced.
    let err = render(
        "text {{define \"dup\"}}a{{end}}{{define \"dup\"}}b{{end}}",
        Value::None,
    )
    .unwrap_err();
    assert_eq!(err.to_string(), "template: duplicate define for dup");
}

#[test]
fn render_is_pure_over_repeated_calls() {
    let template = Template::compile("{{ range .Items }}{{ . }}{{ end }}").unwrap();
    for _ in 0..3 {
        let ctx = map([("Items", Value::from(["x", "y"]))]);
        assert_eq!(template.render_from(ctx).unwrap(), "xy");
    }
}
