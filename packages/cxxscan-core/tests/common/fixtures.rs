//! Source fixtures

/// Two translation units: `a.c` passes null into a function `b.c` dereferences
pub const CTU_NULL_CALLER: &str = "void use(int *p);\nvoid f() {\n    use(0);\n}\n";
pub const CTU_NULL_CALLEE: &str = "void use(int *p) {\n    *p = 3;\n}\n";

/// Uninitialized read plus a division by zero
pub const TWO_DEFECTS: &str = "int f() {\n    int a;\n    a++;\n    int z = 0;\n    return 10 / z;\n}\n";

/// A file with `n` independent `#ifdef` blocks (`n + 1` configurations)
pub fn independent_ifdefs(n: usize) -> String {
    let mut code = String::new();
    for i in 0..n {
        code.push_str(&format!("#ifdef CFG{i}\nint v{i} = {i};\n#endif\n"));
    }
    code.push_str("int main() { return 0; }\n");
    code
}

/// `n` functions with a little arithmetic and control flow each
pub fn generated_functions(n: usize) -> String {
    (0..n)
        .map(|i| {
            format!(
                "int func{i}(int x) {{\n    int a = {i} + 1;\n    if (x > a) {{\n        a = x * 2;\n    }}\n    for (int k = 0; k < 4; k++) {{\n        a += k;\n    }}\n    return a;\n}}\n"
            )
        })
        .collect()
}
