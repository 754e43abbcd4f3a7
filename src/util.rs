// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 工具函数：HTML 页面生成、文件大小格式化与 URI 路径解码。

use std::cmp::Ordering;

use chrono::{DateTime, Local};
use percent_encoding::percent_decode_str;

use crate::backend::Resource;

pub struct HtmlBuilder {
    title: String,
    css: String,
    script: String,
    body: String,
}

impl HtmlBuilder {
    /// 生成集合（目录）的文件列表页面。集合排在前面，其余按名称排序。
    pub fn from_resources(path: &str, children: &[Box<dyn Resource>]) -> Self {
        let mut entries: Vec<ListingEntry> = children.iter().map(|r| ListingEntry::of(r.as_ref())).collect();
        sort_entries(&mut entries);

        let trimmed = path.strip_suffix('/').unwrap_or(path);
        let mut body = String::new();
        body.push_str(&format!("<h1>{}的文件列表</h1><hr>", escape_html(trimmed)));
        body.push_str("<table>");
        body.push_str(
            r#"
            <tr>
                <td>文件名</td>
                <td>大小</td>
                <td>修改时间</td>
            </tr>
            <tr>
                <td><a href="../">..</a></td>
                <td></td>
                <td></td>
            </tr>
            "#,
        );
        for entry in &entries {
            let name = escape_html(&entry.name);
            if entry.is_collection {
                body.push_str(&format!(
                    r#"
                    <tr>
                        <td><a href="{}/">{}/</a></td>
                        <td>文件夹</td>
                        <td>{}</td>
                    </tr>
                    "#,
                    &name, &name, &entry.modified
                ));
            } else {
                body.push_str(&format!(
                    r#"
                    <tr>
                        <td><a href="{}">{}</a></td>
                        <td>{}</td>
                        <td>{}</td>
                    </tr>
                    "#,
                    &name, &name, &entry.size, &entry.modified
                ));
            }
        }
        body.push_str("</table>");
        let title = format!("{}的文件列表", escape_html(path));
        let css = r"
            table {
                border-collapse: collapse;
                width: 100%;
            }

            td {
                padding: 8px;
                white-space: pre-wrap;
                border: none;
            }

            th {
                padding: 8px;
                border: none;
            }"
        .to_string();
        HtmlBuilder {
            title,
            css,
            script: "".to_string(),
            body,
        }
    }

    pub fn build(&self) -> String {
        format!(
            r##"<!DOCTYPE html>
            <!-- 本文件由shaneyale的Rust WebDAV Server自动生成 -->
            <html>
                <head>
                    <meta charset="utf-8">
                    <script>{}</script>
                    <title>{}</title>
                    <style>{}</style>
                </head>
                <body>
                {}
                </body>
            </html>"##,
            self.script, self.title, self.css, self.body
        )
    }
}

/// 列表页中的一行
struct ListingEntry {
    name: String,
    is_collection: bool,
    size: String,
    modified: String,
}

impl ListingEntry {
    fn of(resource: &dyn Resource) -> Self {
        let path = decode_path(resource.uri().path());
        let name = path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string();
        let size = resource
            .content_length()
            .map(format_file_size)
            .unwrap_or_default();
        let modified = resource
            .last_modified_time()
            .map(|t| {
                let local_time: DateTime<Local> = t.into();
                local_time.format("%Y-%m-%d %H:%M:%S %Z").to_string()
            })
            .unwrap_or_default();
        Self {
            name,
            is_collection: resource.is_collection(),
            size,
            modified,
        }
    }
}

fn sort_entries(entries: &mut [ListingEntry]) {
    entries.sort_by(|a, b| match (a.is_collection, b.is_collection) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}

pub fn format_file_size(size: u64) -> String {
    let units = ["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < units.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.1} {}", size, units[unit_index])
}

/// 对 URI 路径做百分号解码，结果按 UTF-8 解释，非法序列以替换字符代替。
pub fn decode_path(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// 转义 HTML 特殊字符
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_size() {
        let a = 9926;
        let b = 51800;
        assert_eq!(format_file_size(a), "9.7 KB".to_string());
        assert_eq!(format_file_size(b), "50.6 KB".to_string());
    }

    #[test]
    fn test_file_size_units() {
        assert_eq!(format_file_size(0), "0.0 B");
        assert_eq!(format_file_size(1023), "1023.0 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5242880), "5.0 MB");
        assert_eq!(format_file_size(3221225472), "3.0 GB");
        assert_eq!(format_file_size(1099511627776), "1.0 TB");
    }

    #[test]
    fn test_empty_listing() {
        let html = HtmlBuilder::from_resources("/dir/", &[]).build();
        assert!(html.contains("/dir的文件列表"));
        assert!(html.contains(r#"<a href="../">..</a>"#));
    }

    #[test]
    fn test_decode_path() {
        assert_eq!(decode_path("/a%20b/c.txt"), "/a b/c.txt");
        assert_eq!(decode_path("/%E4%B8%AD.txt"), "/中.txt");
        assert_eq!(decode_path("/plain"), "/plain");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
