use axum::{response::Html, routing::get, Router};

pub fn router() -> Router {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>🏡 Home Insurance Assistant</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 0; color: #1d1d1f; display: flex; min-height: 100vh; }
    aside { width: 300px; background: #f0f2f6; padding: 1.5rem; box-sizing: border-box; }
    aside button { display: block; width: 100%; text-align: left; margin: 0.4rem 0; padding: 0.5rem; border: 1px solid #ccc; border-radius: 6px; background: #fff; cursor: pointer; }
    main { flex: 1; padding: 2rem; max-width: 900px; }
    .chat-message { padding: 1rem; border-radius: 10px; margin-bottom: 1rem; max-width: 80%; word-wrap: break-word; white-space: pre-wrap; }
    .chat-message.user { background-color: #e6f2ff; margin-left: auto; text-align: right; border: 1px solid #cce0ff; }
    .chat-message.assistant { background-color: #f9f9f9; margin-right: auto; border: 1px solid #e0e0e0; }
    .chat-message p { margin: 0.5rem 0 0 0; font-size: 1rem; }
    .chat-message strong { font-size: 0.9rem; color: #555; }
    form { display: flex; gap: 0.5rem; margin-top: 1rem; }
    form input { flex: 1; padding: 0.6rem; }
    form button { padding: 0.6rem 1.2rem; }
    #status { color: #555; min-height: 1.2rem; }
  </style>
</head>
<body>
  <aside>
    <h2>🏡 Home Insurance</h2>
    <h3>About this assistant</h3>
    <p>I can help you understand:</p>
    <ul>
      <li>Policy coverage details</li>
      <li>Claims process</li>
      <li>Premium information</li>
      <li>Exclusions and limitations</li>
    </ul>
    <p>Ask me anything about your home insurance policy!</p>
    <hr />
    <h3>Sample Questions</h3>
    <div id="samples"></div>
  </aside>

  <main>
    <h1>🏡 Home Insurance Assistant</h1>
    <div id="messages"></div>
    <div id="status"></div>
    <form id="chatForm">
      <input id="userInput" placeholder="Type your question here..." autocomplete="off" />
      <button type="submit">Send</button>
    </form>
  </main>

  <script>
    const messagesEl = document.getElementById('messages');
    const statusEl = document.getElementById('status');
    const input = document.getElementById('userInput');
    const form = document.getElementById('chatForm');

    function render(messages) {
      messagesEl.replaceChildren();
      for (const message of messages) {
        const bubble = document.createElement('div');
        bubble.className = 'chat-message ' + (message.role === 'user' ? 'user' : 'assistant');
        const sender = document.createElement('strong');
        sender.textContent = (message.role === 'user' ? 'You' : 'Assistant') + ':';
        const body = document.createElement('p');
        body.textContent = message.content;
        bubble.append(sender, body);
        messagesEl.append(bubble);
      }
      window.scrollTo(0, document.body.scrollHeight);
    }

    async function loadHistory() {
      const res = await fetch('/api/chat');
      const json = await res.json();
      render(json.messages);
    }

    async function loadSamples() {
      const res = await fetch('/api/samples');
      const samples = await res.json();
      const container = document.getElementById('samples');
      for (const question of samples) {
        const button = document.createElement('button');
        button.type = 'button';
        button.textContent = question;
        button.addEventListener('click', () => { input.value = question; input.focus(); });
        container.append(button);
      }
    }

    form.addEventListener('submit', async (event) => {
      event.preventDefault();
      const message = input.value.trim();
      if (!message) {
        return;
      }
      input.value = '';
      statusEl.textContent = 'Searching policy documents...';
      try {
        const res = await fetch('/api/chat', {
          method: 'POST',
          headers: { 'Content-Type': 'application/json' },
          body: JSON.stringify({ message })
        });
        const json = await res.json();
        if (json.messages) {
          render(json.messages);
        } else if (json.error) {
          statusEl.textContent = json.error;
          return;
        }
        statusEl.textContent = '';
      } catch (err) {
        statusEl.textContent = 'Request failed: ' + err;
      }
    });

    loadHistory();
    loadSamples();
  </script>
</body>
</html>"#;
