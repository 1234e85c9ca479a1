// src/seed.rs

//! Example content loaded into empty collections.

use serde_json::{Value, json};

use crate::{error::AppError, schema::CollectionName, store::DocumentStore};

pub fn example_lessons() -> Vec<Value> {
    vec![json!({
        "lessonId": 1,
        "courseId": 1,
        "contentType": "markdown",
        "content": {
            "markdown": "# Java Basics\n\n## What is Java?\n\nJava is an object-oriented programming language:\n\n- **Portable**: write once, run anywhere\n- **Object-oriented**: encapsulation, inheritance, polymorphism\n- **Secure**: built-in security model\n- **Multithreaded**: concurrency in the standard library\n\n## Hello World\n\n```java\npublic class HelloWorld {\n    public static void main(String[] args) {\n        System.out.println(\"Hello, World!\");\n    }\n}\n```\n\nThe smallest complete Java program."
        },
        "metadata": {
            "tags": ["java", "basics", "introduction"],
            "estimatedReadTime": 5,
            "difficulty": "beginner"
        },
        "version": 1
    })]
}

pub fn example_templates() -> Vec<Value> {
    vec![
        json!({
            "language": "java",
            "templateType": "basic",
            "name": "Java Main Class",
            "description": "Basic Java class with main method",
            "code": "public class {{className}} {\n    public static void main(String[] args) {\n        // Your code here\n        {{code}}\n    }\n}",
            "placeholders": [
                { "name": "className", "description": "Class name", "defaultValue": "Main" },
                { "name": "code", "description": "Main code", "defaultValue": "System.out.println(\"Hello, World!\");" }
            ],
            "tags": ["java", "basic", "main"],
            "difficulty": "beginner",
            "isPublic": true,
            "createdBy": 1
        }),
        json!({
            "language": "python",
            "templateType": "basic",
            "name": "Python Basic Script",
            "description": "Basic Python script template",
            "code": "#!/usr/bin/env python3\n# -*- coding: utf-8 -*-\n\ndef main():\n    # Your code here\n    {{code}}\n\nif __name__ == \"__main__\":\n    main()",
            "placeholders": [
                { "name": "code", "description": "Main code", "defaultValue": "print(\"Hello, World!\")" }
            ],
            "tags": ["python", "basic", "script"],
            "difficulty": "beginner",
            "isPublic": true,
            "createdBy": 1
        }),
    ]
}

pub fn example_exercises() -> Vec<Value> {
    vec![json!({
        "lessonId": 1,
        "title": "Hello World",
        "description": "Write a program that prints \"Hello, World!\"",
        "language": "java",
        "difficulty": "easy",
        "starterCode": "public class HelloWorld {\n    public static void main(String[] args) {\n        // Write your code here\n    }\n}",
        "solutionCode": "public class HelloWorld {\n    public static void main(String[] args) {\n        System.out.println(\"Hello, World!\");\n    }\n}",
        "testCases": [
            {
                "input": "",
                "expectedOutput": "Hello, World!",
                "isHidden": false,
                "description": "Prints Hello, World!"
            }
        ],
        "hints": [
            "Use System.out.println() to print text",
            "Strings are wrapped in double quotes"
        ],
        "timeLimit": 5,
        "memoryLimit": 128000,
        "tags": ["java", "basic", "hello-world"]
    })]
}

/// Inserts the examples into every collection that is still empty.
/// Returns the number of documents inserted.
pub async fn seed_examples(store: &DocumentStore) -> Result<usize, AppError> {
    let batches = [
        (CollectionName::LessonContent, example_lessons()),
        (CollectionName::CodeTemplates, example_templates()),
        (CollectionName::Exercises, example_exercises()),
    ];

    let mut inserted = 0;
    for (name, documents) in batches {
        if store.count(name).await? > 0 {
            tracing::debug!(collection = %name, "Collection not empty, skipping seed");
            continue;
        }
        inserted += store.insert_many(name, documents).await?.len();
    }
    Ok(inserted)
}
