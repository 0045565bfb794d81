use schnitt_chunkers::ChunkerRegistry;
use schnitt_core::{ChunkOptions, ChunkResult};
use tokio_util::sync::CancellationToken;

/// A representative input for one built-in segmenter.
pub struct Sample {
    pub chunker: &'static str,
    pub mime_type: &'static str,
    pub language: &'static str,
    pub text: &'static str,
}

impl Sample {
    pub fn options(&self, max_chunk_size: usize) -> ChunkOptions {
        ChunkOptions {
            mime_type: self.mime_type.to_string(),
            language: self.language.to_string(),
            ..ChunkOptions::default().with_max_chunk_size(max_chunk_size)
        }
    }
}

/// Run `sample` through `registry` with the given cap.
pub fn run(registry: &ChunkerRegistry, sample: &Sample, max_chunk_size: usize) -> ChunkResult {
    registry
        .chunk(&CancellationToken::new(), sample.text, &sample.options(max_chunk_size))
        .unwrap()
}

pub const SAMPLES: &[Sample] = &[
    Sample {
        chunker: "latex",
        mime_type: "",
        language: "paper.tex",
        text: r"\documentclass{article}
\usepackage{amsmath}
\begin{document}
\section{Introduction}
We study segmentation of structured text into bounded pieces.

Retrieval pipelines need chunks that respect structure.
\subsection{Motivation}
Large sections are split at paragraph boundaries.
\begin{equation}
E = mc^2

F = ma
\end{equation}
\section{Method}
The scanner tracks environments on a stack.
\end{document}
",
    },
    Sample {
        chunker: "markdown",
        mime_type: "",
        language: "docs/README.md",
        text: "---
title: Chunking guide
---
Short intro.

# Install
Download the binary.

## From source
```sh
# not a heading
cargo build --release
```

# Usage
Run `schnitt chunk <path>` and read the JSON.
",
    },
    Sample {
        chunker: "dockerfile",
        mime_type: "",
        language: "services/api/Dockerfile",
        text: "# syntax=docker/dockerfile:1
FROM rust:1.80 AS builder
WORKDIR /app
COPY . .
RUN cargo build --release \\
    --locked

FROM debian:bookworm-slim
RUN apt-get update && apt-get install -y ca-certificates
COPY --from=builder /app/target/release/api /usr/local/bin/api
CMD [\"api\"]
",
    },
    Sample {
        chunker: "hcl",
        mime_type: "",
        language: "infra/main.tf",
        text: r#"terraform {
  required_version = ">= 1.5"
}

# primary bucket
resource "aws_s3_bucket" "data" {
  bucket = "data-${var.env}"
  tags = {
    owner = "platform"
  }
}

variable "env" {
  type    = string
  default = "dev"
}

output "bucket_arn" {
  value = aws_s3_bucket.data.arn
}
"#,
    },
    Sample {
        chunker: "protobuf",
        mime_type: "",
        language: "api/v1/user.proto",
        text: r#"syntax = "proto3";
package users.v1;

// A user account.
message User {
  string id = 1;
  string email = 2;
}

enum Role {
  ROLE_UNSPECIFIED = 0;
  ROLE_ADMIN = 1;
}

service UserService {
  rpc GetUser(GetUserRequest) returns (User);
}
"#,
    },
    Sample {
        chunker: "graphql",
        mime_type: "application/graphql",
        language: "",
        text: r#""""A book in the catalogue."""
type Book {
  id: ID!
  title: String!
}

# entry points
type Query {
  books(first: Int = 10): [Book!]!
}

input BookFilter {
  title: String
}
"#,
    },
    Sample {
        chunker: "structured",
        mime_type: "application/json",
        language: "",
        text: r#"[
  {"id": 1, "name": "ada", "tags": ["admin", "ops"]},
  {"id": 2, "name": "grace", "tags": []},
  {"id": 3, "name": "linus", "active": false}
]
"#,
    },
    Sample {
        chunker: "structured",
        mime_type: "",
        language: "deploy/values.yaml",
        text: "# image settings
image:
  repository: api
  tag: \"1.4\"
replicas: 2
---
env:
  - name: LOG
    value: debug
",
    },
    Sample {
        chunker: "structured",
        mime_type: "text/csv",
        language: "",
        text: "id,city,note
1,Berlin,\"first, with comma\"
2,Lisbon,plain
3,Oslo,\"spans
two lines\"
",
    },
    Sample {
        chunker: "sql",
        mime_type: "",
        language: "db/schema.sql",
        text: "CREATE TABLE users (id SERIAL PRIMARY KEY, email TEXT NOT NULL);
CREATE INDEX users_email ON users (email);
CREATE TABLE orders (id SERIAL PRIMARY KEY, user_id INT REFERENCES users(id));
INSERT INTO users (email) VALUES ('a@example.com') RETURNING id;
SELECT count(*) FROM orders;
CREATE FUNCTION touch() RETURNS trigger AS $$
BEGIN
  NEW.updated_at := now();
  RETURN NEW;
END;
$$ LANGUAGE plpgsql;
",
    },
    Sample {
        chunker: "toml",
        mime_type: "",
        language: "config/app.toml",
        text: r#"name = "app"
version = "1.0.0"

[server]
host = "127.0.0.1"
port = 8080

[server.limits]
body = 1048576

[[workers]]
queue = "default"
threads = [1, 2,
  4, 8]
"#,
    },
    Sample {
        chunker: "recursive",
        mime_type: "text/plain",
        language: "notes.txt",
        text: "Segmentation turns long documents into retrievable pieces. Each piece should stand on its own.

Paragraph boundaries are preferred over sentence boundaries! Sentence boundaries are preferred over words; words over raw cuts.

A final short paragraph.",
    },
    Sample {
        chunker: "fallback",
        mime_type: "application/octet-stream",
        language: "dump.bin",
        text: "0011223344556677 8899aabbccddeeff 0011223344556677 8899aabbccddeeff 0011223344556677 8899aabbccddeeff 0011223344556677 8899aabbccddeeff",
    },
];
