// ABOUTME: Dockerfiles synthesized for projects that do not ship one.
// ABOUTME: Node.js (npm or yarn) on node:latest and static sites on nginx:latest.

/// Node.js app: install dependencies first so the layer caches, then copy the tree.
pub fn node(yarn: bool) -> String {
    let mut lines = vec![
        "FROM node:latest",
        "RUN mkdir -p /usr/src/app",
        "WORKDIR /usr/src/app",
        "COPY package.json /usr/src/app/",
    ];
    if yarn {
        lines.push("COPY yarn.lock /usr/src/app/");
        lines.push("RUN yarn install --silent");
    } else {
        lines.push("RUN npm install --silent");
    }
    lines.extend([
        "COPY . /usr/src/app",
        "EXPOSE 80",
        r#"CMD ["npm", "start"]"#,
    ]);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Static HTML served by nginx from its default web root.
pub fn static_site() -> String {
    [
        "FROM nginx:latest",
        "COPY . /usr/share/nginx/html",
        "RUN chmod -R 755 /usr/share/nginx/html",
        "",
    ]
    .join("\n")
}
