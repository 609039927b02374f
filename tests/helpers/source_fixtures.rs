//! Common source texts for tests.

pub const CALC_SIMPLE: &str = "1 + 2;";

pub const CALC_PROGRAM: &str = r#"
total;
/* running sum */
total + 2 * (3 - x);
y * y;
"#;

pub const SLANG_SHADER: &str = r#"
float scale = 2.5;

float4 shade(float3 normal, float intensity) {
    float3 lit = normal * intensity;
    return combine(lit, scale);
}

void main() {
    shade(n, 1);
}
"#;

pub const SLANG_BROKEN: &str = r#"
float a = 1;
void broken() {
    float b = ;
    return b;
}
int c = 3;
"#;
