// SPDX-FileCopyrightText: 2024 Softbear, Inc.
// SPDX-License-Identifier: LGPL-3.0-or-later

#[cfg(test)]
mod log_tests {
    use crate::log::{init_logger, LogFormat, StringLogger};

    #[test]
    fn logger_tests() {
        init_logger(LogFormat::Pretty);
        init_logger(LogFormat::Json);

        let log1 = StringLogger::new("log1");
        assert!(log1.is_empty());
        let bar = 123;
        log1.trace(format!("foo {bar}"));
        log1.trace(format!("bar {bar}"));
        log1.trace(String::new());
        assert_eq!(log1.to_string(), "foo 123\nbar 123");
        assert!(!log1.contains_warnings());

        let log2 = log1.clone();
        log2.trace("shared".to_string());
        assert_eq!(log1.lines().len(), 3);

        let log3 = StringLogger::new("log3");
        log3.warn("this is a warning".to_string());
        assert!(log3.contains_warnings());

        let log4 = StringLogger::default();
        log4.extend(&log1);
        log4.extend(&log3);
        println!("Testing extend:\n{log4}");
        assert_eq!(log4.lines().len(), 4);
        assert!(log4.contains_warnings());

        log1.extend(&log2);
        assert_eq!(log1.lines().len(), 3);
    }

    #[tokio::test]
    async fn logger_across_tasks() {
        let log = StringLogger::new("tasks");
        let mut handles = Vec::new();
        for i in 0..8 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.trace(format!("task {i} done"));
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }
        assert_eq!(log.lines().len(), 8);
    }
}
