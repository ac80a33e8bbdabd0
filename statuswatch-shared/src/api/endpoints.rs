use super::DATA_PATH;

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

pub fn data(base: &str) -> String {
    base_join(base, DATA_PATH)
}
